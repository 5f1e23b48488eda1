use serde::{Deserialize, Serialize};

/// Outcome of a readiness check. Produced fresh on every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub is_ready: bool,
    pub message: String,
}

impl Readiness {
    pub fn ready(message: impl Into<String>) -> Self {
        Self {
            is_ready: true,
            message: message.into(),
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            is_ready: false,
            message: message.into(),
        }
    }
}

/// Operator-provided options consulted by readiness checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadinessOptions {
    /// Name patterns (`*`/`?` wildcards, case-insensitive) that cannot be upgraded automatically.
    #[serde(default)]
    pub unsupported: Vec<String>,

    /// Proceed even when unsupported references are present.
    #[serde(default)]
    pub ignore_unsupported: bool,
}
