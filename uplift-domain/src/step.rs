use crate::cancel::Cancelled;
use crate::context::UpgradeContext;
use crate::error::StepError;
use async_trait::async_trait;
use tracing::{debug, info, warn};
use uplift_types::step::{FileChange, StepMeta, StepResult, StepStatus};

/// The behaviour of one kind of upgrade step.
///
/// `initialize` inspects and reports `Complete`, `Incomplete` or `Failed`; `apply` performs
/// the mutation and reports `Complete` or `Failed`. Either may return an error, which the
/// owning [`UpgradeStep`] turns into a failed status.
#[async_trait]
pub trait StepLogic: Send + Sync {
    fn meta(&self) -> StepMeta;

    async fn initialize(&self, ctx: &UpgradeContext) -> Result<StepResult, StepError>;

    async fn apply(&self, ctx: &UpgradeContext) -> Result<StepResult, StepError>;
}

/// A step plus the status it owns.
pub struct UpgradeStep {
    meta: StepMeta,
    logic: Box<dyn StepLogic>,
    status: StepStatus,
    details: String,
    change: Option<FileChange>,
    recheck: bool,
}

impl std::fmt::Debug for UpgradeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeStep")
            .field("id", &self.meta.id)
            .field("status", &self.status)
            .field("details", &self.details)
            .finish_non_exhaustive()
    }
}

impl UpgradeStep {
    pub fn new(logic: Box<dyn StepLogic>) -> Self {
        Self {
            meta: logic.meta(),
            logic,
            status: StepStatus::Unknown,
            details: String::new(),
            change: None,
            recheck: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn meta(&self) -> &StepMeta {
        &self.meta
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    /// Digests of the last project write this step made.
    pub fn change(&self) -> Option<&FileChange> {
        self.change.as_ref()
    }

    /// Prepare for another run over the same step list.
    ///
    /// `Skipped` stays; `Complete` stays until initialize re-checks it; anything else
    /// starts over from `Unknown`.
    pub fn reset_for_run(&mut self) {
        match self.status {
            StepStatus::Skipped => {}
            StepStatus::Complete => self.recheck = true,
            StepStatus::Unknown | StepStatus::Incomplete | StepStatus::Failed => {
                self.status = StepStatus::Unknown;
                self.details.clear();
            }
        }
    }

    /// Operator opt-out. Only valid before the step has reached a terminal status.
    pub fn skip(&mut self, reason: impl Into<String>) -> bool {
        if !matches!(self.status, StepStatus::Unknown | StepStatus::Incomplete) {
            return false;
        }
        self.status = StepStatus::Skipped;
        self.details = reason.into();
        info!(step = %self.meta.id, "skipped");
        true
    }

    /// Run the inspection phase.
    ///
    /// Allowed from `Unknown`, and once from `Complete` after [`UpgradeStep::reset_for_run`]. Errors
    /// other than cancellation become `Failed`; cancellation leaves the status untouched
    /// and is returned to the caller.
    pub async fn initialize(&mut self, ctx: &UpgradeContext) -> Result<StepStatus, Cancelled> {
        let rechecking = self.status == StepStatus::Complete && self.recheck;
        if self.status != StepStatus::Unknown && !rechecking {
            return Ok(self.status);
        }
        if ctx.cancel().is_cancelled() {
            return Err(Cancelled);
        }
        self.recheck = false;

        debug!(step = %self.meta.id, from = %self.status, "initialize");
        let result = self.logic.initialize(ctx).await;
        let result = match result {
            Ok(r) if r.status == StepStatus::Skipped || r.status == StepStatus::Unknown => {
                StepResult::failed(format!("initialize reported {}", r.status))
            }
            Ok(r) => r,
            Err(StepError::Cancelled) => return Err(Cancelled),
            Err(e) => failure(&e),
        };
        self.record(result);
        Ok(self.status)
    }

    /// Run the mutation phase. A no-op unless the step is `Incomplete`.
    pub async fn apply(&mut self, ctx: &UpgradeContext) -> Result<StepStatus, Cancelled> {
        if self.status != StepStatus::Incomplete {
            return Ok(self.status);
        }
        if ctx.cancel().is_cancelled() {
            return Err(Cancelled);
        }

        debug!(step = %self.meta.id, "apply");
        let result = match self.logic.apply(ctx).await {
            Ok(r) if r.status != StepStatus::Complete && r.status != StepStatus::Failed => {
                StepResult::failed(format!("apply reported {}", r.status))
            }
            Ok(r) => r,
            Err(StepError::Cancelled) => return Err(Cancelled),
            Err(e) => failure(&e),
        };
        self.record(result);
        Ok(self.status)
    }

    fn record(&mut self, result: StepResult) {
        match result.status {
            StepStatus::Failed => warn!(step = %self.meta.id, details = %result.details, "failed"),
            status => info!(step = %self.meta.id, %status, details = %result.details),
        }
        self.status = result.status;
        self.details = result.details;
        if result.change.is_some() {
            self.change = result.change;
        }
    }
}

fn failure(err: &StepError) -> StepResult {
    if let StepError::ProjectMalformed { message, .. } | StepError::ConfigMalformed { message, .. } = err {
        debug!(%message, "malformed resource");
    }
    StepResult::failed(err.to_string())
}
