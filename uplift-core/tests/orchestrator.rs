//! Orchestrator behaviour over scripted steps.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uplift_core::{CancelToken, Orchestrator, OrchestratorError, StepLogic, UpgradeContext, UpgradeStep, execution_order};
use uplift_domain::{StepError, UpgradeOptions};
use uplift_edit::MemoryProjectStore;
use uplift_types::run::{RunOutcome, StepDisposition};
use uplift_types::step::{StepMeta, StepResult, StepStatus};

type Log = Arc<Mutex<Vec<String>>>;

#[derive(Clone, Copy)]
enum Behaviour {
    /// Nothing to do.
    Done,
    /// Needs work; apply succeeds.
    Work,
    /// Needs work; the first `n` applies fail.
    FlakyApply(usize),
    /// Initialize fails.
    BrokenInit,
    /// Needs work; apply requests cancellation and reports it.
    CancelDuringApply,
}

struct Scripted {
    id: &'static str,
    deps: Vec<&'static str>,
    behaviour: Behaviour,
    log: Log,
    attempts: AtomicUsize,
    applied: AtomicUsize,
    cancel: CancelToken,
}

#[async_trait]
impl StepLogic for Scripted {
    fn meta(&self) -> StepMeta {
        StepMeta {
            id: self.id.to_string(),
            title: format!("Step {}", self.id),
            description: String::new(),
            depends_on: self.deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    async fn initialize(&self, _ctx: &UpgradeContext) -> Result<StepResult, StepError> {
        self.log.lock().unwrap().push(format!("init:{}", self.id));
        let done = self.applied.load(Ordering::SeqCst) > 0;
        Ok(match self.behaviour {
            Behaviour::BrokenInit => StepResult::failed("Project file Cargo.toml not found"),
            Behaviour::Done => StepResult::complete("nothing to do"),
            _ if done => StepResult::complete("already applied"),
            _ => StepResult::incomplete("work pending"),
        })
    }

    async fn apply(&self, _ctx: &UpgradeContext) -> Result<StepResult, StepError> {
        self.log.lock().unwrap().push(format!("apply:{}", self.id));
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::FlakyApply(n) if attempt < n => Ok(StepResult::failed("transient failure")),
            Behaviour::CancelDuringApply => {
                self.cancel.cancel();
                Err(StepError::Cancelled)
            }
            _ => {
                self.applied.fetch_add(1, Ordering::SeqCst);
                Ok(StepResult::complete("applied"))
            }
        }
    }
}

struct Harness {
    log: Log,
    ctx: UpgradeContext,
    cancel: CancelToken,
}

impl Harness {
    fn new() -> Self {
        let cancel = CancelToken::new();
        let ctx = UpgradeContext::new(
            Arc::new(MemoryProjectStore::new("Cargo.toml", "")),
            "map.json".into(),
            UpgradeOptions::default(),
        )
        .with_cancel(cancel.clone());
        Self {
            log: Arc::default(),
            ctx,
            cancel,
        }
    }

    fn step(&self, id: &'static str, deps: &[&'static str], behaviour: Behaviour) -> UpgradeStep {
        UpgradeStep::new(Box::new(Scripted {
            id,
            deps: deps.to_vec(),
            behaviour,
            log: self.log.clone(),
            attempts: AtomicUsize::new(0),
            applied: AtomicUsize::new(0),
            cancel: self.cancel.clone(),
        }))
    }

    fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

#[tokio::test]
async fn runs_dependencies_first_and_applies_incomplete_steps() {
    let h = Harness::new();
    let mut orch = Orchestrator::new(vec![
        h.step("refs", &["backup"], Behaviour::Work),
        h.step("backup", &[], Behaviour::Work),
        h.step("lint", &[], Behaviour::Done),
    ]);

    let report = orch.run(&h.ctx).await.unwrap();

    assert_eq!(
        h.take_log(),
        vec!["init:backup", "apply:backup", "init:refs", "apply:refs", "init:lint"]
    );
    assert_eq!(report.outcome, RunOutcome::AllComplete);
    let dispositions: Vec<_> = report.steps.iter().map(|s| (s.id.as_str(), s.disposition)).collect();
    assert_eq!(
        dispositions,
        vec![
            ("backup", StepDisposition::Applied),
            ("refs", StepDisposition::Applied),
            ("lint", StepDisposition::Verified),
        ]
    );
    assert!(report.ended_at.is_some());
}

#[tokio::test]
async fn cycle_executes_zero_steps() {
    let h = Harness::new();
    let mut orch = Orchestrator::new(vec![
        h.step("a", &["b"], Behaviour::Work),
        h.step("b", &["a"], Behaviour::Work),
        h.step("c", &[], Behaviour::Work),
    ]);

    let err = orch.run(&h.ctx).await.unwrap_err();

    assert!(matches!(err, OrchestratorError::CyclicDependency { .. }));
    assert!(h.take_log().is_empty());
    assert!(orch.steps().iter().all(|s| s.status() == StepStatus::Unknown));
}

#[tokio::test]
async fn failure_blocks_dependents_but_not_independent_steps() {
    let h = Harness::new();
    let mut orch = Orchestrator::new(vec![
        h.step("backup", &[], Behaviour::BrokenInit),
        h.step("refs", &["backup"], Behaviour::Work),
        h.step("lint", &[], Behaviour::Work),
    ]);

    let report = orch.run(&h.ctx).await.unwrap();

    assert_eq!(h.take_log(), vec!["init:backup", "init:lint", "apply:lint"]);
    match &report.outcome {
        RunOutcome::SomeFailed { failed } => {
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].id, "backup");
            assert_eq!(failed[0].details, "Project file Cargo.toml not found");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    let refs = report.step("refs").unwrap();
    assert_eq!(refs.disposition, StepDisposition::Blocked);
    assert_eq!(refs.blocked_by, vec!["backup".to_string()]);
    assert_eq!(refs.status, StepStatus::Unknown);
}

#[tokio::test]
async fn resumed_run_retries_failures_and_rechecks_completed_steps() {
    let h = Harness::new();
    let mut orch = Orchestrator::new(vec![
        h.step("backup", &[], Behaviour::Work),
        h.step("refs", &["backup"], Behaviour::FlakyApply(1)),
    ]);

    let first = orch.run(&h.ctx).await.unwrap();
    assert!(matches!(first.outcome, RunOutcome::SomeFailed { .. }));
    assert_eq!(orch.step("refs").unwrap().status(), StepStatus::Failed);
    h.take_log();

    let second = orch.run(&h.ctx).await.unwrap();

    assert_eq!(second.outcome, RunOutcome::AllComplete);
    // backup is re-initialized but not applied again.
    assert_eq!(h.take_log(), vec!["init:backup", "init:refs", "apply:refs"]);
    assert_eq!(second.step("backup").unwrap().disposition, StepDisposition::Verified);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn skipped_steps_satisfy_dependents_and_stay_skipped() {
    let h = Harness::new();
    let mut orch = Orchestrator::new(vec![
        h.step("backup", &[], Behaviour::Work),
        h.step("refs", &["backup"], Behaviour::Work),
    ]);
    assert!(orch.skip("backup", "Skipped by operator"));
    assert!(!orch.skip("ghost", "nope"));

    let report = orch.run(&h.ctx).await.unwrap();
    assert_eq!(h.take_log(), vec!["init:refs", "apply:refs"]);
    assert_eq!(report.step("backup").unwrap().disposition, StepDisposition::Skipped);

    orch.run(&h.ctx).await.unwrap();
    assert_eq!(orch.step("backup").unwrap().status(), StepStatus::Skipped);
}

#[tokio::test]
async fn inspect_never_applies() {
    let h = Harness::new();
    let mut orch = Orchestrator::new(vec![
        h.step("backup", &[], Behaviour::Work),
        h.step("refs", &["backup"], Behaviour::Work),
    ]);

    let report = orch.inspect(&h.ctx).await.unwrap();

    assert_eq!(h.take_log(), vec!["init:backup", "init:refs"]);
    assert!(report
        .steps
        .iter()
        .all(|s| s.disposition == StepDisposition::Inspected && s.status == StepStatus::Incomplete));
}

#[tokio::test]
async fn cancellation_mid_run_stops_and_resumes() {
    let h = Harness::new();
    let mut orch = Orchestrator::new(vec![
        h.step("backup", &[], Behaviour::Work),
        h.step("refs", &["backup"], Behaviour::CancelDuringApply),
        h.step("lint", &["refs"], Behaviour::Work),
    ]);

    let err = orch.run(&h.ctx).await.unwrap_err();

    assert_eq!(err, OrchestratorError::Cancelled);
    assert_eq!(orch.step("backup").unwrap().status(), StepStatus::Complete);
    assert_eq!(orch.step("refs").unwrap().status(), StepStatus::Incomplete);
    assert_eq!(orch.step("lint").unwrap().status(), StepStatus::Unknown);
    assert_eq!(orch.next_step(), Some("refs"));
    assert!(!h.take_log().contains(&"init:lint".to_string()));
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let h = Harness::new();
    let mut orch = Orchestrator::new(vec![h.step("a", &[], Behaviour::Work)]);
    h.cancel.cancel();

    assert_eq!(orch.run(&h.ctx).await.unwrap_err(), OrchestratorError::Cancelled);
    assert!(h.take_log().is_empty());
}

fn arb_dag() -> impl Strategy<Value = Vec<StepMeta>> {
    (1..9usize)
        .prop_flat_map(|n| {
            let deps = (0..n)
                .map(|i| prop::collection::vec(any::<bool>(), i))
                .collect::<Vec<_>>();
            (Just(n), deps)
        })
        .prop_map(|(n, deps)| {
            (0..n)
                .map(|i| StepMeta {
                    id: format!("s{i}"),
                    title: String::new(),
                    description: String::new(),
                    depends_on: deps[i]
                        .iter()
                        .enumerate()
                        .filter(|(_, on)| **on)
                        .map(|(j, _)| format!("s{j}"))
                        .collect(),
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

proptest! {
    #[test]
    fn order_respects_every_dependency(steps in arb_dag()) {
        let order = execution_order(&steps).unwrap();
        prop_assert_eq!(order.len(), steps.len());

        let position = |id: &str| order.iter().position(|&i| steps[i].id == id).unwrap();
        for step in &steps {
            for dep in &step.depends_on {
                prop_assert!(position(dep.as_str()) < position(step.id.as_str()));
            }
        }
    }
}
