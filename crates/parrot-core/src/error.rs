//! Domain-specific error types following panic-free policy.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while touching coordination state.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Could not create the state directory
    #[error("Failed to create state directory {path}: {source}")]
    StateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading or writing a marker/record file failed
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
