//! Error types for container encryption.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while protecting or unprotecting a container.
///
/// `Crypto` deliberately carries no detail: tag mismatches, padding failures
/// and truncated AEAD streams all surface as the same error.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Missing or mismatched key material on the certificate.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Malformed or truncated container, or invalid transport encoding.
    #[error("format error: {0}")]
    Format(String),

    /// Authentication or padding failure.
    #[error("decryption failed (tampered or corrupted data)")]
    Crypto,

    /// Payload does not fit the selected method.
    #[error("capacity exceeded: {size} bytes exceeds limit of {limit} bytes")]
    Capacity { size: u64, limit: u64 },

    /// Underlying stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine parameters out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The operation was cancelled before completion.
    #[error("operation cancelled")]
    Cancelled,
}

impl CryptoError {
    /// Maps an error raised while reading container bytes.
    ///
    /// Early EOF means a truncated container and `InvalidData` comes from the
    /// Base64 decoding reader; both are format problems, not I/O failures.
    pub(crate) fn from_read(err: std::io::Error, what: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                CryptoError::Format(format!("container truncated while reading {what}"))
            }
            std::io::ErrorKind::InvalidData => {
                CryptoError::Format(format!("invalid transport encoding: {err}"))
            }
            _ => CryptoError::Io(err),
        }
    }
}
