//! Plain-text rendering of run reports and step listings.

use std::fmt::Write;
use uplift_types::run::{RunOutcome, RunReport, StepDisposition, StepRecord};
use uplift_types::step::{StepMeta, StepStatus};

fn disposition_label(d: StepDisposition) -> &'static str {
    match d {
        StepDisposition::Verified => "ok",
        StepDisposition::Applied => "applied",
        StepDisposition::Inspected => "pending",
        StepDisposition::Skipped => "skipped",
        StepDisposition::Blocked => "blocked",
        StepDisposition::Failed => "FAILED",
    }
}

fn render_step(out: &mut String, record: &StepRecord) {
    let _ = write!(
        out,
        "[{:>7}] {} ({})",
        disposition_label(record.disposition),
        record.id,
        record.title
    );
    if !record.details.is_empty() {
        let _ = write!(out, ": {}", record.details);
    }
    out.push('\n');
    if let Some(change) = &record.change {
        let _ = writeln!(
            out,
            "          {} sha256 {} -> {}",
            change.path,
            short(&change.sha256_before),
            short(&change.sha256_after)
        );
        if let Some(backup) = &change.backup_path {
            let _ = writeln!(out, "          backup at {backup}");
        }
    }
}

fn short(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::AllComplete => "All steps complete".to_string(),
        RunOutcome::SomeFailed { failed } => {
            let mut s = format!("{} step(s) failed:", failed.len());
            for f in failed {
                let _ = write!(s, "\n  - {}: {}", f.id, f.details);
            }
            s
        }
        RunOutcome::Blocked { blocked } => format!("Blocked: {}", blocked.join(", ")),
    }
}

/// One line per step followed by the aggregate outcome.
pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();
    for record in &report.steps {
        render_step(&mut out, record);
    }
    out.push_str(&render_outcome(&report.outcome));
    out.push('\n');
    out
}

/// Inspection summary: per-step lines, then which steps a run would apply.
pub fn render_plan(report: &RunReport) -> String {
    let mut out = String::new();
    for record in &report.steps {
        render_step(&mut out, record);
    }

    let pending: Vec<&str> = report
        .steps
        .iter()
        .filter(|r| r.status == StepStatus::Incomplete)
        .map(|r| r.id.as_str())
        .collect();
    if pending.is_empty() {
        out.push_str("Nothing to do\n");
    } else {
        let _ = writeln!(out, "A run would apply: {}", pending.join(", "));
    }
    if !report.outcome.is_success() {
        out.push_str(&render_outcome(&report.outcome));
        out.push('\n');
    }
    out
}

pub fn render_steps(metas: &[StepMeta]) -> String {
    let mut out = String::new();
    for meta in metas {
        let _ = writeln!(out, "{}: {}", meta.id, meta.title);
        let _ = writeln!(out, "    {}", meta.description);
        if !meta.depends_on.is_empty() {
            let _ = writeln!(out, "    depends on: {}", meta.depends_on.join(", "));
        }
    }
    out
}
