use crate::step::{FileChange, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run-level aggregate outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    AllComplete,
    SomeFailed { failed: Vec<FailedStep> },
    Blocked { blocked: Vec<String> },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::AllComplete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedStep {
    pub id: String,
    pub details: String,
}

/// What the orchestrator did with a step during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDisposition {
    /// Initialized and found nothing to do.
    Verified,
    /// Initialized, then applied.
    Applied,
    /// Initialized only (inspection run).
    Inspected,
    /// Skipped by the operator.
    Skipped,
    /// A dependency was not complete or skipped.
    Blocked,
    /// Initialize or apply reported failure.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: String,
    pub title: String,
    pub status: StepStatus,
    pub details: String,
    pub disposition: StepDisposition,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<FileChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub steps: Vec<StepRecord>,

    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            schema: crate::schema::UPLIFT_RUN_V1.to_string(),
            run_id,
            started_at,
            ended_at: None,
            steps: vec![],
            outcome: RunOutcome::AllComplete,
        }
    }

    pub fn step(&self, id: &str) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.id == id)
    }
}
