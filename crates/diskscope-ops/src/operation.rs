//! Operation error types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A per-file failure; the operation carries on with the remaining files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// The path that caused the error.
    pub path: PathBuf,
    /// A human-readable error message.
    pub message: String,
}

impl OperationError {
    /// Create a new operation error.
    pub fn new(path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Failure that stops an operation before any original is touched.
#[derive(Debug, Error)]
pub enum OpsError {
    /// The archive file could not be created.
    #[error("cannot create archive {path}: {source}")]
    CreateArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the archive's trailing data failed; nothing was deleted.
    #[error("cannot finish archive {path}: {source}")]
    FinishArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry write failed after the archive stream was committed to it;
    /// the partial archive was removed and nothing was deleted.
    #[error("cannot write {entry} into archive {path}: {source}")]
    WriteArchive {
        path: PathBuf,
        entry: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive would be written over one of its own inputs.
    #[error("archive path {path} is also listed as an input")]
    ArchiveIsInput { path: PathBuf },
}
