use crate::context::UpgradeContext;
use crate::error::StepError;
use crate::step::StepLogic;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use uplift_edit::sha256_hex;
use uplift_types::step::{FileChange, StepMeta, StepResult};

pub const BACKUP_STEP_ID: &str = "backup";

/// Copies the project aside before anything rewrites it.
///
/// An existing backup is never overwritten, so a resumed run keeps the pre-upgrade copy.
#[derive(Debug, Clone)]
pub struct BackupStep {
    project: Utf8PathBuf,
    suffix: String,
}

impl BackupStep {
    pub fn new(project: &Utf8Path, suffix: &str) -> Self {
        Self {
            project: project.to_path_buf(),
            suffix: suffix.to_string(),
        }
    }
}

#[async_trait]
impl StepLogic for BackupStep {
    fn meta(&self) -> StepMeta {
        StepMeta {
            id: BACKUP_STEP_ID.to_string(),
            title: "Back up project".to_string(),
            description: format!(
                "Copy {0} to {0}{1} before it is modified",
                self.project, self.suffix
            ),
            depends_on: vec![],
        }
    }

    async fn initialize(&self, ctx: &UpgradeContext) -> Result<StepResult, StepError> {
        if !ctx.options().backups.enabled {
            return Ok(StepResult::complete("Backups disabled"));
        }

        ctx.store().read_raw().await?;
        if ctx.store().has_backup(&self.suffix).await {
            Ok(StepResult::complete("Backup already exists"))
        } else {
            Ok(StepResult::incomplete("Backup needed"))
        }
    }

    async fn apply(&self, ctx: &UpgradeContext) -> Result<StepResult, StepError> {
        let _writer = ctx.lock_project().await;
        ctx.cancel().check()?;

        if ctx.store().has_backup(&self.suffix).await {
            return Ok(StepResult::complete("Backup already exists"));
        }
        let contents = ctx.store().read_raw().await?;
        let dest = ctx.store().backup(&self.suffix).await?;
        let digest = sha256_hex(contents.as_bytes());
        Ok(
            StepResult::complete(format!("Backup created at {dest}")).with_change(FileChange {
                path: ctx.project_path().to_string(),
                sha256_before: digest.clone(),
                sha256_after: digest,
                backup_path: Some(dest.to_string()),
            }),
        )
    }
}
