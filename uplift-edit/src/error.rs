//! Error types for project access.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Failures reading, parsing or persisting the project resource.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// The project resource does not exist.
    #[error("project file {path} not found")]
    NotFound { path: Utf8PathBuf },

    /// The project resource exists but is not a valid structural document.
    #[error("invalid project {path}: {message}")]
    Malformed { path: Utf8PathBuf, message: String },

    /// Any other I/O failure.
    #[error("io error on {path}: {message}")]
    Io { path: Utf8PathBuf, message: String },
}

impl ProjectError {
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            ProjectError::NotFound { path }
            | ProjectError::Malformed { path, .. }
            | ProjectError::Io { path, .. } => path,
        }
    }

    pub(crate) fn io(path: &camino::Utf8Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ProjectError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProjectError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
        }
    }
}
