use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefMapError {
    #[error("reference map {path} not found")]
    ConfigNotFound { path: Utf8PathBuf },

    #[error("reference map {path} could not be read: {message}")]
    Unreadable { path: Utf8PathBuf, message: String },

    #[error("invalid reference map {path}: {message}")]
    ConfigMalformed { path: Utf8PathBuf, message: String },
}

impl RefMapError {
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            RefMapError::ConfigNotFound { path }
            | RefMapError::Unreadable { path, .. }
            | RefMapError::ConfigMalformed { path, .. } => path,
        }
    }
}
