use crate::context::UpgradeContext;
use crate::error::StepError;
use crate::readiness::ReadinessSuite;
use crate::rewriter::rewrite;
use crate::step::StepLogic;
use crate::steps::backup::BACKUP_STEP_ID;
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;
use uplift_edit::StagedEdit;
use uplift_types::plan::RewritePlan;
use uplift_types::reference::DependencyRef;
use uplift_types::step::{FileChange, StepMeta, StepResult};

pub const REFERENCE_STEP_ID: &str = "update-references";

/// Replaces outdated references according to the reference map and ensures the support
/// reference is declared.
pub struct ReferenceUpdateStep {
    project: Utf8PathBuf,
    map: Utf8PathBuf,
    readiness: ReadinessSuite,
}

impl ReferenceUpdateStep {
    pub fn new(project: &Utf8Path, map: &Utf8Path) -> Self {
        Self {
            project: project.to_path_buf(),
            map: map.to_path_buf(),
            readiness: ReadinessSuite::builtin(),
        }
    }

    /// Reload the project and compute the plan against its current references.
    async fn plan(&self, ctx: &UpgradeContext) -> Result<RewritePlan, StepError> {
        let map = ctx.reference_map().await?;
        let doc = ctx.store().load().await?;
        let plan = rewrite(&doc.references(), &map, &ctx.options().support);
        debug!(
            remove = plan.to_remove.len(),
            add = plan.to_add.len(),
            "computed rewrite plan"
        );
        Ok(plan)
    }
}

fn pending(plan: &RewritePlan, support: &DependencyRef) -> StepResult {
    if plan.outdated_count() > 0 {
        StepResult::incomplete(format!("{} references need updating", plan.outdated_count()))
    } else if !plan.to_add.is_empty() {
        StepResult::incomplete(format!("Reference to {support} needed"))
    } else {
        StepResult::complete("No reference updates needed")
    }
}

#[async_trait]
impl StepLogic for ReferenceUpdateStep {
    fn meta(&self) -> StepMeta {
        StepMeta {
            id: REFERENCE_STEP_ID.to_string(),
            title: "Update dependency references".to_string(),
            description: format!(
                "Replace outdated references in {} using the reference map {}",
                self.project, self.map
            ),
            depends_on: vec![BACKUP_STEP_ID.to_string()],
        }
    }

    async fn initialize(&self, ctx: &UpgradeContext) -> Result<StepResult, StepError> {
        let plan = self.plan(ctx).await?;

        let readiness = self.readiness.evaluate(ctx).await;
        if !readiness.is_ready {
            return Ok(StepResult::incomplete(readiness.message));
        }
        Ok(pending(&plan, &ctx.options().support))
    }

    async fn apply(&self, ctx: &UpgradeContext) -> Result<StepResult, StepError> {
        let _writer = ctx.lock_project().await;

        // The project may have changed since initialize.
        let plan = self.plan(ctx).await?;
        let readiness = self.readiness.evaluate(ctx).await;
        if !readiness.is_ready {
            return Ok(StepResult::failed(readiness.message));
        }
        if plan.is_empty() {
            return Ok(StepResult::complete("No reference updates needed"));
        }

        let staged = StagedEdit::build(ctx.store(), &plan).await?;
        // Last point at which cancellation leaves the project untouched.
        ctx.cancel().check()?;
        let record = staged.commit(ctx.store()).await?;

        Ok(StepResult::complete("References updated").with_change(FileChange {
            path: record.path.to_string(),
            sha256_before: record.sha256_before,
            sha256_after: record.sha256_after,
            backup_path: None,
        }))
    }
}
