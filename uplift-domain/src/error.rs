use camino::Utf8PathBuf;
use thiserror::Error;
use uplift_edit::ProjectError;
use uplift_refmap::RefMapError;

/// Why a step could not finish a phase.
///
/// The display strings double as the step's status details, so keep them short and stable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StepError {
    #[error("Reference map {path} not found")]
    ConfigNotFound { path: Utf8PathBuf },

    #[error("Invalid reference map {path}: {message}")]
    ConfigMalformed { path: Utf8PathBuf, message: String },

    #[error("Project file {path} not found")]
    ProjectNotFound { path: Utf8PathBuf },

    #[error("Invalid project: {path}")]
    ProjectMalformed { path: Utf8PathBuf, message: String },

    #[error("I/O error on {path}: {message}")]
    Io { path: Utf8PathBuf, message: String },

    #[error("cancelled")]
    Cancelled,
}

impl From<RefMapError> for StepError {
    fn from(err: RefMapError) -> Self {
        match err {
            RefMapError::ConfigNotFound { path } => StepError::ConfigNotFound { path },
            RefMapError::ConfigMalformed { path, message } => {
                StepError::ConfigMalformed { path, message }
            }
            RefMapError::Unreadable { path, message } => StepError::Io { path, message },
        }
    }
}

impl From<ProjectError> for StepError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::NotFound { path } => StepError::ProjectNotFound { path },
            ProjectError::Malformed { path, message } => {
                StepError::ProjectMalformed { path, message }
            }
            ProjectError::Io { path, message } => StepError::Io { path, message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_name_the_resource() {
        let err: StepError = ProjectError::Malformed {
            path: "proj/Cargo.toml".into(),
            message: "expected `]`".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Invalid project: proj/Cargo.toml");

        let err: StepError = RefMapError::ConfigNotFound {
            path: "map.json".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Reference map map.json not found");
    }
}
