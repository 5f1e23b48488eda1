//! Edit engine for uplift rewrite plans.
//!
//! Responsibilities:
//! - Define the project model capability (`ProjectDocument` + `ProjectStore`) the domain depends on.
//! - Provide a `toml_edit` backed manifest document plus filesystem and in-memory stores.
//! - Apply a `RewritePlan` to an in-memory document, render a unified diff preview, and
//!   fingerprint persisted contents.

mod apply;
mod document;
mod error;
mod store;

pub use apply::{ApplyRecord, StagedEdit, apply_to_document, preview_patch, render_patch, sha256_hex};
pub use document::{ManifestDocument, ProjectDocument};
pub use error::ProjectError;
pub use store::{FsProjectStore, MemoryProjectStore, ProjectStore};
