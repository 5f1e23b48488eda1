//! Domain logic: what an upgrade step checks and changes.
//!
//! This crate owns the reference rewrite algorithm, readiness checks and the step
//! state machine. It does not own ordering or run aggregation; that's `uplift-core`.

mod cancel;
mod context;
mod error;
mod readiness;
mod rewriter;
mod step;
mod steps;

pub use cancel::{CancelToken, Cancelled};
pub use context::{
    BackupOptions, DEFAULT_BACKUP_SUFFIX, DEFAULT_SUPPORT_NAME, DEFAULT_SUPPORT_VERSION,
    UpgradeContext, UpgradeOptions,
};
pub use error::StepError;
pub use readiness::{
    ProjectLoadsCheck, ReadinessCheck, ReadinessSuite, SupportedReferencesCheck,
};
pub use rewriter::rewrite;
pub use step::{StepLogic, UpgradeStep};
pub use steps::{
    BACKUP_STEP_ID, BackupStep, REFERENCE_STEP_ID, ReferenceUpdateStep, builtin_step_metas,
    builtin_steps,
};
