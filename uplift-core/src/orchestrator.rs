//! Step orchestration: dependency ordering, lifecycle driving and run aggregation.

use crate::error::OrchestratorError;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};
use uplift_domain::{UpgradeContext, UpgradeStep};
use uplift_types::run::{FailedStep, RunOutcome, RunReport, StepDisposition, StepRecord};
use uplift_types::step::{StepMeta, StepStatus};
use uuid::Uuid;

/// Topological order of `steps` by `depends_on` (Kahn's algorithm).
///
/// Returns indices into `steps`. Among steps that are ready at the same time, declared
/// order wins, so an already valid list keeps its order.
pub fn execution_order(steps: &[StepMeta]) -> Result<Vec<usize>, OrchestratorError> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        if index.insert(step.id.as_str(), i).is_some() {
            return Err(OrchestratorError::DuplicateStep {
                id: step.id.clone(),
            });
        }
    }

    let mut in_degree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
    for (i, step) in steps.iter().enumerate() {
        // A repeated dependency counts once.
        let deps: BTreeSet<&str> = step.depends_on.iter().map(String::as_str).collect();
        for dep in deps {
            let Some(&d) = index.get(dep) else {
                return Err(OrchestratorError::UnknownDependency {
                    step: step.id.clone(),
                    dependency: dep.to_string(),
                });
            };
            in_degree[i] += 1;
            dependents[d].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..steps.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(steps.len());
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &j in &dependents[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.insert(j);
            }
        }
    }

    if order.len() < steps.len() {
        let stuck = (0..steps.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| steps[i].id.clone())
            .collect();
        return Err(OrchestratorError::CyclicDependency { steps: stuck });
    }
    Ok(order)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Run,
    Inspect,
}

/// Owns an ordered step list and drives it through a run.
///
/// The same orchestrator can be run repeatedly: finished work is re-checked but not
/// redone, and failed work is retried.
#[derive(Debug)]
pub struct Orchestrator {
    steps: Vec<UpgradeStep>,
    cursor: usize,
}

impl Orchestrator {
    pub fn new(steps: Vec<UpgradeStep>) -> Self {
        Self { steps, cursor: 0 }
    }

    pub fn steps(&self) -> &[UpgradeStep] {
        &self.steps
    }

    pub fn metas(&self) -> Vec<StepMeta> {
        self.steps.iter().map(|s| s.meta().clone()).collect()
    }

    pub fn step(&self, id: &str) -> Option<&UpgradeStep> {
        self.steps.iter().find(|s| s.id() == id)
    }

    /// Operator opt-out for one step. Returns false for unknown ids or finished steps.
    pub fn skip(&mut self, id: &str, reason: &str) -> bool {
        match self.steps.iter_mut().find(|s| s.id() == id) {
            Some(step) => step.skip(reason),
            None => false,
        }
    }

    /// Id of the next step the current (or last) run would process.
    pub fn next_step(&self) -> Option<&str> {
        let order = execution_order(&self.metas()).ok()?;
        order.get(self.cursor).map(|&i| self.steps[i].id())
    }

    /// Initialize every step and apply the ones with work to do.
    pub async fn run(&mut self, ctx: &UpgradeContext) -> Result<RunReport, OrchestratorError> {
        self.drive(ctx, Mode::Run).await
    }

    /// Initialize every step without applying anything.
    ///
    /// A dependency that is merely `Incomplete` does not block its dependents here, since a
    /// real run would apply it first.
    pub async fn inspect(&mut self, ctx: &UpgradeContext) -> Result<RunReport, OrchestratorError> {
        self.drive(ctx, Mode::Inspect).await
    }

    async fn drive(&mut self, ctx: &UpgradeContext, mode: Mode) -> Result<RunReport, OrchestratorError> {
        let order = execution_order(&self.metas())?;
        let index: HashMap<String, usize> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id().to_string(), i))
            .collect();

        for step in &mut self.steps {
            step.reset_for_run();
        }

        let mut report = RunReport::new(Uuid::new_v4(), Utc::now());
        info!(run_id = %report.run_id, steps = order.len(), ?mode, "run started");

        self.cursor = 0;
        for &i in &order {
            if ctx.cancel().is_cancelled() {
                warn!(next = %self.steps[i].id(), "run cancelled");
                return Err(OrchestratorError::Cancelled);
            }

            let blocked_by: Vec<String> = self.steps[i]
                .meta()
                .depends_on
                .iter()
                .filter(|dep| {
                    let status = index
                        .get(dep.as_str())
                        .map(|&d| self.steps[d].status())
                        .unwrap_or_default();
                    !(status.satisfies_dependents()
                        || (mode == Mode::Inspect && status == StepStatus::Incomplete))
                })
                .cloned()
                .collect();

            let step = &mut self.steps[i];
            let record = if step.status() == StepStatus::Skipped {
                debug!(step = %step.id(), "skipped by operator");
                record(step, StepDisposition::Skipped, vec![])
            } else if !blocked_by.is_empty() {
                info!(step = %step.id(), blocked_by = ?blocked_by, "blocked");
                record(step, StepDisposition::Blocked, blocked_by)
            } else {
                let disposition = drive_step(step, ctx, mode).await?;
                record(step, disposition, vec![])
            };
            report.steps.push(record);
            self.cursor += 1;
        }

        report.outcome = aggregate(&report.steps);
        report.ended_at = Some(Utc::now());
        info!(run_id = %report.run_id, outcome = ?report.outcome, "run finished");
        Ok(report)
    }
}

async fn drive_step(
    step: &mut UpgradeStep,
    ctx: &UpgradeContext,
    mode: Mode,
) -> Result<StepDisposition, OrchestratorError> {
    let cancelled = |_| OrchestratorError::Cancelled;

    let status = step.initialize(ctx).await.map_err(cancelled)?;
    let disposition = match (status, mode) {
        (StepStatus::Complete, _) => StepDisposition::Verified,
        (StepStatus::Incomplete, Mode::Inspect) => StepDisposition::Inspected,
        (StepStatus::Incomplete, Mode::Run) => match step.apply(ctx).await.map_err(cancelled)? {
            StepStatus::Complete => StepDisposition::Applied,
            _ => StepDisposition::Failed,
        },
        (StepStatus::Skipped, _) => StepDisposition::Skipped,
        (StepStatus::Failed | StepStatus::Unknown, _) => StepDisposition::Failed,
    };
    Ok(disposition)
}

fn record(step: &UpgradeStep, disposition: StepDisposition, blocked_by: Vec<String>) -> StepRecord {
    let details = if blocked_by.is_empty() {
        step.details().to_string()
    } else {
        format!("Waiting on {}", blocked_by.join(", "))
    };
    StepRecord {
        id: step.id().to_string(),
        title: step.meta().title.clone(),
        status: step.status(),
        details,
        disposition,
        blocked_by,
        change: match disposition {
            StepDisposition::Applied => step.change().cloned(),
            _ => None,
        },
    }
}

/// Failures take precedence over blocks.
fn aggregate(records: &[StepRecord]) -> RunOutcome {
    let failed: Vec<FailedStep> = records
        .iter()
        .filter(|r| r.disposition == StepDisposition::Failed)
        .map(|r| FailedStep {
            id: r.id.clone(),
            details: r.details.clone(),
        })
        .collect();
    if !failed.is_empty() {
        return RunOutcome::SomeFailed { failed };
    }

    let blocked: Vec<String> = records
        .iter()
        .filter(|r| r.disposition == StepDisposition::Blocked)
        .map(|r| r.id.clone())
        .collect();
    if !blocked.is_empty() {
        return RunOutcome::Blocked { blocked };
    }
    RunOutcome::AllComplete
}
