use thiserror::Error;

/// Run-fatal errors. Each aborts before or between steps; step failures are data, not errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("cyclic dependency among steps: {}", .steps.join(", "))]
    CyclicDependency { steps: Vec<String> },

    #[error("duplicate step id '{id}'")]
    DuplicateStep { id: String },

    #[error("step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("run cancelled")]
    Cancelled,
}
