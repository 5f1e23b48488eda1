//! Default upgrade pipeline: assemble the builtin steps and drive them.

use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;
use crate::settings::RunSettings;
use std::sync::Arc;
use tracing::{debug, warn};
use uplift_domain::{CancelToken, StepError, UpgradeContext, builtin_steps, rewrite};
use uplift_edit::{ProjectStore, preview_patch};
use uplift_types::run::RunReport;

/// Result of an inspection: what each step would do, and the diff the reference rewrite
/// would write.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub report: RunReport,

    /// `None` when the map or project could not be loaded.
    pub preview: Option<String>,
}

/// Build the per-run context for `settings`.
pub fn build_context(
    settings: &RunSettings,
    store: Arc<dyn ProjectStore>,
    cancel: CancelToken,
) -> UpgradeContext {
    UpgradeContext::new(store, settings.map_path.clone(), settings.upgrade_options()).with_cancel(cancel)
}

/// Builtin steps with the operator's skip list applied.
pub fn build_orchestrator(settings: &RunSettings) -> Orchestrator {
    let options = settings.upgrade_options();
    let mut orchestrator = Orchestrator::new(builtin_steps(&settings.project, &settings.map_path, &options));
    for id in &settings.skip {
        if !orchestrator.skip(id, "Skipped by operator") {
            warn!(step = %id, "cannot skip unknown step");
        }
    }
    orchestrator
}

pub async fn run_upgrade(
    settings: &RunSettings,
    store: Arc<dyn ProjectStore>,
    cancel: CancelToken,
) -> Result<RunReport, OrchestratorError> {
    let ctx = build_context(settings, store, cancel);
    build_orchestrator(settings).run(&ctx).await
}

pub async fn inspect_upgrade(
    settings: &RunSettings,
    store: Arc<dyn ProjectStore>,
    cancel: CancelToken,
) -> Result<Inspection, OrchestratorError> {
    let ctx = build_context(settings, store, cancel);
    let report = build_orchestrator(settings).inspect(&ctx).await?;

    let preview = match preview(&ctx).await {
        Ok(p) => Some(p),
        Err(e) => {
            debug!(error = %e, "no preview");
            None
        }
    };
    Ok(Inspection { report, preview })
}

/// Unified diff the reference rewrite would produce right now.
pub async fn preview(ctx: &UpgradeContext) -> Result<String, StepError> {
    let map = ctx.reference_map().await?;
    let doc = ctx.store().load().await?;
    let plan = rewrite(&doc.references(), &map, &ctx.options().support);
    Ok(preview_patch(ctx.store(), &plan).await?)
}
