use crate::cancel::CancelToken;
use crate::error::StepError;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::info;
use uplift_edit::ProjectStore;
use uplift_refmap::{RefMapError, ReferenceMap};
use uplift_types::readiness::ReadinessOptions;
use uplift_types::reference::DependencyRef;

pub const DEFAULT_SUPPORT_NAME: &str = "uplift-support";
pub const DEFAULT_SUPPORT_VERSION: &str = "1.0.0";
pub const DEFAULT_BACKUP_SUFFIX: &str = ".uplift.bak";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    pub enabled: bool,
    pub suffix: String,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    /// Auxiliary reference every upgraded project must declare.
    pub support: DependencyRef,
    pub readiness: ReadinessOptions,
    pub backups: BackupOptions,
}

impl Default for UpgradeOptions {
    fn default() -> Self {
        Self {
            support: DependencyRef::versioned(DEFAULT_SUPPORT_NAME, DEFAULT_SUPPORT_VERSION),
            readiness: ReadinessOptions::default(),
            backups: BackupOptions::default(),
        }
    }
}

/// Per-run state handed to every step.
///
/// Built at run start and dropped at run end. The reference map is loaded at most once
/// per context and then shared read-only; the project is reloaded by every phase.
pub struct UpgradeContext {
    store: Arc<dyn ProjectStore>,
    map_path: Utf8PathBuf,
    map: OnceCell<Result<Arc<ReferenceMap>, RefMapError>>,
    options: UpgradeOptions,
    cancel: CancelToken,
    writer: Mutex<()>,
}

impl std::fmt::Debug for UpgradeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeContext")
            .field("project", &self.store.location())
            .field("map_path", &self.map_path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl UpgradeContext {
    pub fn new(store: Arc<dyn ProjectStore>, map_path: Utf8PathBuf, options: UpgradeOptions) -> Self {
        Self {
            store,
            map_path,
            map: OnceCell::new(),
            options,
            cancel: CancelToken::new(),
            writer: Mutex::new(()),
        }
    }

    /// Use an already loaded map instead of reading `map_path`.
    pub fn with_map(self, map: Arc<ReferenceMap>) -> Self {
        Self {
            map: OnceCell::new_with(Some(Ok(map))),
            ..self
        }
    }

    pub fn with_cancel(self, cancel: CancelToken) -> Self {
        Self { cancel, ..self }
    }

    pub fn store(&self) -> &dyn ProjectStore {
        self.store.as_ref()
    }

    pub fn project_path(&self) -> &Utf8Path {
        self.store.location()
    }

    pub fn map_path(&self) -> &Utf8Path {
        &self.map_path
    }

    pub fn options(&self) -> &UpgradeOptions {
        &self.options
    }

    pub fn cancel(&self) -> &CancelToken {
        &self.cancel
    }

    /// The shared reference map. A load failure is remembered for the rest of the run.
    ///
    /// A map with an entry that matches the support reference is rejected as malformed.
    pub async fn reference_map(&self) -> Result<Arc<ReferenceMap>, StepError> {
        let loaded = self
            .map
            .get_or_init(|| async {
                let map = uplift_refmap::load(&self.map_path).await?;
                info!(path = %self.map_path, entries = map.len(), "reference map loaded");
                Ok::<_, RefMapError>(Arc::new(map))
            })
            .await;
        let map = loaded.clone().map_err(StepError::from)?;

        // An entry matching the support reference would remove it on every run.
        let support = &self.options.support;
        if let Some(entry) = map.find_match(&support.name, support.version.as_deref()) {
            return Err(StepError::ConfigMalformed {
                path: self.map_path.clone(),
                message: format!("entry '{}' matches the support reference {support}", entry.name),
            });
        }
        Ok(map)
    }

    /// Exclusive write access to the project. Hold it across reload, edit and save.
    pub async fn lock_project(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uplift_edit::MemoryProjectStore;

    #[tokio::test]
    async fn missing_map_fails_every_time() {
        let store = Arc::new(MemoryProjectStore::new("Cargo.toml", ""));
        let ctx = UpgradeContext::new(store, "does/not/exist.json".into(), UpgradeOptions::default());

        for _ in 0..2 {
            let err = ctx.reference_map().await.unwrap_err();
            assert_eq!(err.to_string(), "Reference map does/not/exist.json not found");
        }
    }

    #[tokio::test]
    async fn map_matching_support_reference_is_malformed() {
        let json = r#"[{"name": "shim", "match": [{"name": "uplift-*"}], "replacements": [{"name": "y", "version": "1"}]}]"#;
        let map = uplift_refmap::parse(json, uplift_refmap::MapFormat::Json, Utf8Path::new("map.json")).unwrap();
        let store = Arc::new(MemoryProjectStore::new("Cargo.toml", ""));
        let ctx = UpgradeContext::new(store, "map.json".into(), UpgradeOptions::default())
            .with_map(Arc::new(map));

        let err = ctx.reference_map().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid reference map map.json: entry 'shim' matches the support reference uplift-support@1.0.0"
        );
    }

    #[tokio::test]
    async fn injected_map_is_shared() {
        let store = Arc::new(MemoryProjectStore::new("Cargo.toml", ""));
        let map = Arc::new(ReferenceMap::default());
        let ctx = UpgradeContext::new(store, "unused.json".into(), UpgradeOptions::default())
            .with_map(map.clone());

        let got = ctx.reference_map().await.unwrap();
        assert!(Arc::ptr_eq(&got, &map));
    }
}
