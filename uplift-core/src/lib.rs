//! Embeddable core library for uplift.
//!
//! Provides a clap-free entry point that sequences upgrade steps against a project.
//!
//! # Entry points
//!
//! - [`run_upgrade`](pipeline::run_upgrade): initialize and apply every step in dependency order
//! - [`inspect_upgrade`](pipeline::inspect_upgrade): initialize only, plus a diff preview
//! - [`Orchestrator`](orchestrator::Orchestrator): drive a custom step list

pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod settings;

pub use error::OrchestratorError;
pub use orchestrator::{Orchestrator, execution_order};

// Re-export so embedders don't need uplift-domain directly.
pub use uplift_domain::{CancelToken, StepLogic, UpgradeContext, UpgradeStep};
