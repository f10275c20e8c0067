//! Error types for file-level operations.

use filevault_crypto::CryptoError;
use filevault_erase::EraseError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for file-level operations.
pub type FileVaultResult<T> = Result<T, FileVaultError>;

/// Errors that can occur while protecting, unprotecting or erasing files.
#[derive(Debug, Error)]
pub enum FileVaultError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("erase error: {0}")]
    Erase(#[from] EraseError),

    /// File name does not follow the protected-file naming convention.
    #[error("format error: {0}")]
    Format(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// The source is held under an exclusive lock by another handle.
    #[error("source file is locked: {}", .0.display())]
    Locked(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A batch worker panicked or was cancelled by the runtime.
    #[error("batch worker failed: {0}")]
    Worker(String),
}

impl From<toml::de::Error> for FileVaultError {
    fn from(err: toml::de::Error) -> Self {
        FileVaultError::Config(err.to_string())
    }
}
