use crate::document::ProjectDocument;
use crate::error::ProjectError;
use crate::store::ProjectStore;
use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uplift_types::plan::RewritePlan;

/// What a committed edit changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRecord {
    pub path: Utf8PathBuf,
    pub sha256_before: String,
    pub sha256_after: String,
    pub removed: usize,
    pub added: usize,
}

impl ApplyRecord {
    pub fn changed(&self) -> bool {
        self.sha256_before != self.sha256_after
    }
}

/// Apply a plan to an in-memory document. Removals happen before additions.
///
/// Returns `(removed, added)`.
pub fn apply_to_document(doc: &mut dyn ProjectDocument, plan: &RewritePlan) -> (usize, usize) {
    let mut removed = 0;
    for reference in &plan.to_remove {
        removed += doc.remove_reference(reference);
    }
    for reference in &plan.to_add {
        doc.add_reference(reference);
    }
    (removed, plan.to_add.len())
}

/// A fully built edit that has not been persisted yet.
///
/// Building one performs every in-memory mutation; [`StagedEdit::commit`] is the only
/// write. Dropping a staged edit leaves the project untouched.
pub struct StagedEdit {
    path: Utf8PathBuf,
    before: String,
    doc: Box<dyn ProjectDocument>,
    removed: usize,
    added: usize,
}

impl std::fmt::Debug for StagedEdit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedEdit")
            .field("path", &self.path)
            .field("removed", &self.removed)
            .field("added", &self.added)
            .finish_non_exhaustive()
    }
}

impl StagedEdit {
    /// Reload the project from `store` and apply `plan` in memory.
    pub async fn build(store: &dyn ProjectStore, plan: &RewritePlan) -> Result<Self, ProjectError> {
        let before = store.read_raw().await?;
        let mut doc = store.decode(&before)?;
        let (removed, added) = apply_to_document(doc.as_mut(), plan);
        debug!(path = %store.location(), removed, added, "staged edit");
        Ok(Self {
            path: store.location().to_path_buf(),
            before,
            doc,
            removed,
            added,
        })
    }

    pub fn before(&self) -> &str {
        &self.before
    }

    pub fn after(&self) -> String {
        self.doc.render()
    }

    /// Unified diff of the staged change.
    pub fn patch(&self) -> String {
        render_patch(&self.path, &self.before, &self.after())
    }

    /// Persist the staged document.
    pub async fn commit(self, store: &dyn ProjectStore) -> Result<ApplyRecord, ProjectError> {
        let after = self.doc.render();
        store.save(self.doc.as_ref()).await?;

        let record = ApplyRecord {
            path: self.path,
            sha256_before: sha256_hex(self.before.as_bytes()),
            sha256_after: sha256_hex(after.as_bytes()),
            removed: self.removed,
            added: self.added,
        };
        info!(
            path = %record.path,
            before = %record.sha256_before,
            after = %record.sha256_after,
            removed = record.removed,
            added = record.added,
            "applied rewrite plan"
        );
        Ok(record)
    }
}

/// Render the diff `plan` would produce, without writing anything.
pub async fn preview_patch(store: &dyn ProjectStore, plan: &RewritePlan) -> Result<String, ProjectError> {
    Ok(StagedEdit::build(store, plan).await?.patch())
}

/// Unified diff of one file, git-style headers. Empty when nothing changed.
pub fn render_patch(path: &Utf8Path, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    let body = PatchFormatter::new().fmt_patch(&patch).to_string();
    // diffy prints its own ---/+++ header; keep only the hunks.
    for line in body.lines().skip_while(|l| !l.starts_with("@@")) {
        out.push_str(line);
        out.push('\n');
    }
    out
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryProjectStore;
    use uplift_types::reference::DependencyRef;

    fn plan() -> RewritePlan {
        RewritePlan {
            to_remove: vec![DependencyRef::versioned("PackageA", "1.0")],
            to_add: vec![DependencyRef::versioned("PackageB", "2.0")],
            ..Default::default()
        }
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn identical_contents_render_no_patch() {
        assert_eq!(render_patch(Utf8Path::new("Cargo.toml"), "a\n", "a\n"), "");
    }

    #[test]
    fn patch_has_git_headers_and_hunks() {
        let patch = render_patch(Utf8Path::new("Cargo.toml"), "a = 1\n", "b = 2\n");
        assert!(patch.starts_with("diff --git a/Cargo.toml b/Cargo.toml\n--- a/Cargo.toml\n+++ b/Cargo.toml\n@@"));
        assert!(patch.contains("-a = 1\n"));
        assert!(patch.contains("+b = 2\n"));
        assert_eq!(patch.matches("--- ").count(), 1);
    }

    #[tokio::test]
    async fn preview_does_not_write() {
        let store = MemoryProjectStore::new("Cargo.toml", "[dependencies]\nPackageA = \"1.0\"\n");
        let patch = preview_patch(&store, &plan()).await.unwrap();

        assert!(patch.contains("-PackageA = \"1.0\""));
        assert!(patch.contains("+PackageB = \"2.0\""));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn dropped_stage_leaves_project_untouched() {
        let original = "[dependencies]\nPackageA = \"1.0\"\n";
        let store = MemoryProjectStore::new("Cargo.toml", original);

        let staged = StagedEdit::build(&store, &plan()).await.unwrap();
        assert!(staged.after().contains("PackageB"));
        drop(staged);

        assert_eq!(store.contents().await.as_deref(), Some(original));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn commit_records_digests() {
        let original = "[dependencies]\nPackageA = \"1.0\"\n";
        let store = MemoryProjectStore::new("Cargo.toml", original);

        let record = StagedEdit::build(&store, &plan())
            .await
            .unwrap()
            .commit(&store)
            .await
            .unwrap();

        assert_eq!(record.removed, 1);
        assert_eq!(record.added, 1);
        assert!(record.changed());
        assert_eq!(record.sha256_before, sha256_hex(original.as_bytes()));
        let now = store.contents().await.unwrap();
        assert_eq!(record.sha256_after, sha256_hex(now.as_bytes()));
    }
}
