use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an upgrade step.
///
/// - unknown: not yet initialized in this run
/// - incomplete: initialized, work is needed
/// - complete / failed / skipped: terminal for the remainder of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Unknown,
    Incomplete,
    Complete,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepStatus::Complete | StepStatus::Failed | StepStatus::Skipped
        )
    }

    /// Whether dependents of a step in this status may proceed.
    pub fn satisfies_dependents(self) -> bool {
        matches!(self, StepStatus::Complete | StepStatus::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Unknown => "unknown",
            StepStatus::Incomplete => "incomplete",
            StepStatus::Complete => "complete",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status plus a short human-readable detail string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub status: StepStatus,
    pub details: String,

    /// Set when the step wrote the project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<FileChange>,
}

/// Digests of a file a step rewrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub sha256_before: String,
    pub sha256_after: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<String>,
}

impl StepResult {
    pub fn new(status: StepStatus, details: impl Into<String>) -> Self {
        Self {
            status,
            details: details.into(),
            change: None,
        }
    }

    pub fn with_change(mut self, change: FileChange) -> Self {
        self.change = Some(change);
        self
    }

    pub fn complete(details: impl Into<String>) -> Self {
        Self::new(StepStatus::Complete, details)
    }

    pub fn incomplete(details: impl Into<String>) -> Self {
        Self::new(StepStatus::Incomplete, details)
    }

    pub fn failed(details: impl Into<String>) -> Self {
        Self::new(StepStatus::Failed, details)
    }
}

/// Descriptive metadata every step exposes to reporting layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMeta {
    pub id: String,
    pub title: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}
