use crate::context::UpgradeContext;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};
use uplift_refmap::NamePattern;
use uplift_types::readiness::Readiness;
use uplift_types::reference::DependencyRef;

/// A read-only precondition on project state.
///
/// Checks never mutate and produce a fresh result on every call.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    fn id(&self) -> &'static str;

    /// What the operator should do when the check fails.
    fn upgrade_message(&self) -> &'static str;

    async fn is_ready(&self, ctx: &UpgradeContext) -> Readiness;
}

/// The project resource exists and parses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectLoadsCheck;

#[async_trait]
impl ReadinessCheck for ProjectLoadsCheck {
    fn id(&self) -> &'static str {
        "project-loads"
    }

    fn upgrade_message(&self) -> &'static str {
        "Fix the project file so it can be read."
    }

    async fn is_ready(&self, ctx: &UpgradeContext) -> Readiness {
        match ctx.store().load().await {
            Ok(_) => Readiness::ready("Project loads"),
            Err(e) => Readiness::blocked(format!("{e}. {}", self.upgrade_message())),
        }
    }
}

/// No declared reference matches an operator-configured unsupported pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct SupportedReferencesCheck;

#[async_trait]
impl ReadinessCheck for SupportedReferencesCheck {
    fn id(&self) -> &'static str {
        "supported-references"
    }

    fn upgrade_message(&self) -> &'static str {
        "Remove them or set readiness.ignore_unsupported to continue anyway."
    }

    async fn is_ready(&self, ctx: &UpgradeContext) -> Readiness {
        let options = &ctx.options().readiness;
        if options.ignore_unsupported || options.unsupported.is_empty() {
            return Readiness::ready("No unsupported references configured");
        }

        // An unloadable project is `project-loads`' concern.
        let Ok(doc) = ctx.store().load().await else {
            return Readiness::ready("Project not loaded; nothing to check");
        };

        let patterns: Vec<NamePattern> = options.unsupported.iter().map(NamePattern::new).collect();
        // The same reference declared in several tables is reported once.
        let mut found: Vec<DependencyRef> = Vec::new();
        for r in doc.references() {
            if patterns.iter().any(|p| p.matches(&r.name)) && !found.iter().any(|f| f.is_same_as(&r)) {
                found.push(r);
            }
        }

        if found.is_empty() {
            Readiness::ready("All references supported")
        } else {
            Readiness::blocked(format!(
                "Unsupported references: {}. {}",
                found.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", "),
                self.upgrade_message()
            ))
        }
    }
}

/// Runs a set of checks concurrently. All must pass.
///
/// Every failure is logged; the message of the first failing check in declared order is
/// the one reported.
pub struct ReadinessSuite {
    checks: Vec<Box<dyn ReadinessCheck>>,
}

impl Default for ReadinessSuite {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReadinessSuite {
    pub fn new(checks: Vec<Box<dyn ReadinessCheck>>) -> Self {
        Self { checks }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            Box::new(ProjectLoadsCheck),
            Box::new(SupportedReferencesCheck),
        ])
    }

    pub fn check_ids(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.id()).collect()
    }

    pub async fn evaluate(&self, ctx: &UpgradeContext) -> Readiness {
        let results = join_all(self.checks.iter().map(|c| c.is_ready(ctx))).await;

        let mut first_failure = None;
        for (check, result) in self.checks.iter().zip(results) {
            if result.is_ready {
                debug!(check = check.id(), "ready");
                continue;
            }
            warn!(check = check.id(), message = %result.message, "not ready");
            first_failure.get_or_insert(result);
        }

        first_failure.unwrap_or_else(|| Readiness::ready("Ready"))
    }
}
