//! Error taxonomy for data aggregation.

use std::path::{Path, PathBuf};

/// Errors that can occur while discovering or aggregating locale data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Filesystem error at {}: {message}", path.display())]
    Filesystem { path: PathBuf, message: String },

    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid locale tag: {0:?}")]
    InvalidLocale(String),
}

impl DataError {
    pub(crate) fn filesystem(path: &Path, message: impl ToString) -> Self {
        Self::Filesystem {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    pub(crate) fn parse(path: &Path, message: impl ToString) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }

    /// The file or directory the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Filesystem { path, .. } | Self::Parse { path, .. } => Some(path),
            Self::InvalidLocale(_) => None,
        }
    }
}
