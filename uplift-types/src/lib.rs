//! Shared DTOs (schemas-as-code) for the uplift workspace.
//!
//! # Design constraints
//! - These types cross crate boundaries and the run report is serialized to disk.
//! - Be conservative with breaking changes.
//! - Prefer adding optional fields over changing semantics.

pub mod plan;
pub mod readiness;
pub mod reference;
pub mod run;
pub mod step;

/// Schema identifiers.
pub mod schema {
    pub const UPLIFT_RUN_V1: &str = "uplift.run.v1";
}
