//! File-level protection for filevault.
//!
//! Wraps the container engine from `filevault-crypto` and the eraser from
//! `filevault-erase` into operations on paths:
//!
//! - [`protect_file`] writes `<source>.enc`
//! - [`unprotect_file`] turns `<name>.enc` back into `<name>`
//! - [`securely_erase`] overwrites and removes a file
//! - [`BatchProcessor`] runs many of these on a bounded pool
//!
//! The free functions use default settings. Build a [`FileVault`] from a
//! [`FileVaultConfig`] for anything else.

pub mod batch;
pub mod cache;
pub mod config;
mod error;
pub mod files;
mod logging;

pub use batch::{BatchFailure, BatchProcessor, BatchSuccess, BatchSummary};
pub use cache::CertificateCache;
pub use config::FileVaultConfig;
pub use error::{FileVaultError, FileVaultResult};
pub use files::{read_container, FileVault, ProtectOptions, UnprotectOptions};
pub use logging::init_logging;

pub use filevault_crypto::{
    AesKeySize, AesMode, CancelToken, Certificate, CryptoError, Method, RsaCertificate,
};
pub use filevault_erase::{EraseError, EraseReport, PassReport};

use std::path::{Path, PathBuf};

/// Protects `source` with default settings. See [`FileVault::protect_file`].
pub fn protect_file(
    source: &Path,
    certificate: &dyn Certificate,
    options: &ProtectOptions,
) -> FileVaultResult<PathBuf> {
    FileVault::default().protect_file(source, certificate, options, &CancelToken::new())
}

/// Unprotects `container` with default settings. See
/// [`FileVault::unprotect_file`].
pub fn unprotect_file(
    container: &Path,
    certificate: &dyn Certificate,
    options: &UnprotectOptions,
) -> FileVaultResult<PathBuf> {
    FileVault::default().unprotect_file(container, certificate, options, &CancelToken::new())
}

/// Overwrites `path` `passes` times, randomizes its timestamps, then removes it.
pub fn securely_erase(path: &Path, passes: u32) -> FileVaultResult<EraseReport> {
    Ok(filevault_erase::erase(path, passes)?)
}
