//! Erase error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for erase operations.
pub type EraseResult<T> = Result<T, EraseError>;

/// Errors that can occur while securely erasing a file.
#[derive(Debug, Error)]
pub enum EraseError {
    /// Another handle holds a lock on the file. Not retried.
    #[error("file is locked by another handle: {}", .0.display())]
    Locked(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("invalid erase configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
