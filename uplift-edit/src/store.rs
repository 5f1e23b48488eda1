use crate::document::{ManifestDocument, ProjectDocument};
use crate::error::ProjectError;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Persistent home of a project resource.
///
/// Every `load` re-reads the resource; nothing is cached between calls.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    fn location(&self) -> &Utf8Path;

    async fn read_raw(&self) -> Result<String, ProjectError>;

    /// Parse raw contents into a document.
    fn decode(&self, contents: &str) -> Result<Box<dyn ProjectDocument>, ProjectError>;

    async fn load(&self) -> Result<Box<dyn ProjectDocument>, ProjectError> {
        let contents = self.read_raw().await?;
        debug!(path = %self.location(), bytes = contents.len(), "loaded project");
        self.decode(&contents)
    }

    /// Persist the document in one step; a failed save leaves the previous contents intact.
    async fn save(&self, doc: &dyn ProjectDocument) -> Result<(), ProjectError>;

    async fn has_backup(&self, suffix: &str) -> bool;

    /// Copy the current contents aside. Returns where the copy lives.
    async fn backup(&self, suffix: &str) -> Result<Utf8PathBuf, ProjectError>;
}

fn parse_manifest(path: &Utf8Path, contents: &str) -> Result<ManifestDocument, ProjectError> {
    ManifestDocument::parse(contents).map_err(|message| ProjectError::Malformed {
        path: path.to_path_buf(),
        message,
    })
}

fn with_suffix(path: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{path}{suffix}"))
}

/// File-system backed manifest store.
#[derive(Debug, Clone)]
pub struct FsProjectStore {
    path: Utf8PathBuf,
}

impl FsProjectStore {
    pub fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ProjectStore for FsProjectStore {
    fn location(&self) -> &Utf8Path {
        &self.path
    }

    async fn read_raw(&self) -> Result<String, ProjectError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ProjectError::io(&self.path, e))
    }

    fn decode(&self, contents: &str) -> Result<Box<dyn ProjectDocument>, ProjectError> {
        Ok(Box::new(parse_manifest(&self.path, contents)?))
    }

    async fn save(&self, doc: &dyn ProjectDocument) -> Result<(), ProjectError> {
        let rendered = doc.render();
        let tmp = with_suffix(&self.path, ".uplift-tmp");

        tokio::fs::write(&tmp, rendered.as_bytes())
            .await
            .map_err(|e| ProjectError::io(&tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ProjectError::io(&self.path, e));
        }

        debug!(path = %self.path, bytes = rendered.len(), "saved project");
        Ok(())
    }

    async fn has_backup(&self, suffix: &str) -> bool {
        tokio::fs::try_exists(with_suffix(&self.path, suffix))
            .await
            .unwrap_or(false)
    }

    async fn backup(&self, suffix: &str) -> Result<Utf8PathBuf, ProjectError> {
        let dest = with_suffix(&self.path, suffix);
        tokio::fs::copy(&self.path, &dest)
            .await
            .map_err(|e| ProjectError::io(&self.path, e))?;
        debug!(from = %self.path, to = %dest, "backed up project");
        Ok(dest)
    }
}

/// In-memory store for embedding and testing.
#[derive(Debug)]
pub struct MemoryProjectStore {
    location: Utf8PathBuf,
    contents: Mutex<Option<String>>,
    backups: Mutex<BTreeMap<Utf8PathBuf, String>>,
    saves: AtomicUsize,
}

impl MemoryProjectStore {
    pub fn new(location: impl Into<Utf8PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            contents: Mutex::new(Some(contents.into())),
            backups: Mutex::new(BTreeMap::new()),
            saves: AtomicUsize::new(0),
        }
    }

    /// A store whose resource does not exist.
    pub fn missing(location: impl Into<Utf8PathBuf>) -> Self {
        Self {
            location: location.into(),
            contents: Mutex::new(None),
            backups: Mutex::new(BTreeMap::new()),
            saves: AtomicUsize::new(0),
        }
    }

    pub async fn contents(&self) -> Option<String> {
        self.contents.lock().await.clone()
    }

    pub async fn set_contents(&self, contents: impl Into<String>) {
        *self.contents.lock().await = Some(contents.into());
    }

    pub async fn backup_contents(&self, suffix: &str) -> Option<String> {
        let key = with_suffix(&self.location, suffix);
        self.backups.lock().await.get(&key).cloned()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    fn location(&self) -> &Utf8Path {
        &self.location
    }

    async fn read_raw(&self) -> Result<String, ProjectError> {
        self.contents
            .lock()
            .await
            .clone()
            .ok_or_else(|| ProjectError::NotFound {
                path: self.location.clone(),
            })
    }

    fn decode(&self, contents: &str) -> Result<Box<dyn ProjectDocument>, ProjectError> {
        Ok(Box::new(parse_manifest(&self.location, contents)?))
    }

    async fn save(&self, doc: &dyn ProjectDocument) -> Result<(), ProjectError> {
        *self.contents.lock().await = Some(doc.render());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn has_backup(&self, suffix: &str) -> bool {
        let key = with_suffix(&self.location, suffix);
        self.backups.lock().await.contains_key(&key)
    }

    async fn backup(&self, suffix: &str) -> Result<Utf8PathBuf, ProjectError> {
        let contents = self.read_raw().await?;
        let key = with_suffix(&self.location, suffix);
        self.backups.lock().await.insert(key.clone(), contents);
        Ok(key)
    }
}
