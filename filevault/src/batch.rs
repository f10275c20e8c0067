//! Bounded worker pool for protecting or unprotecting many files.
//!
//! Each file is an independent job on the blocking thread pool. A semaphore
//! caps how many run at once. Jobs share nothing but the immutable
//! [`FileVault`] and the certificate; each generates its own key material.
//! A failing job is recorded and never stops its siblings.

use crate::cache::CertificateCache;
use crate::error::{FileVaultError, FileVaultResult};
use crate::files::{FileVault, ProtectOptions, UnprotectOptions};
use filevault_crypto::CancelToken;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// A job that completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSuccess {
    pub source: PathBuf,
    pub output: PathBuf,
}

/// A job that failed, with the reason.
#[derive(Debug)]
pub struct BatchFailure {
    pub source: PathBuf,
    pub error: FileVaultError,
}

/// Results of a batch, in completion order.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<BatchSuccess>,
    pub failed: Vec<BatchFailure>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs file operations concurrently on a bounded pool.
pub struct BatchProcessor {
    vault: Arc<FileVault>,
    certificates: Arc<CertificateCache>,
    workers: usize,
}

impl BatchProcessor {
    /// `workers` is an upper bound; the pool never exceeds the machine's
    /// available parallelism.
    pub fn new(vault: FileVault, certificates: Arc<CertificateCache>, workers: usize) -> Self {
        Self {
            vault: Arc::new(vault),
            certificates,
            workers,
        }
    }

    pub fn parallelism(&self) -> usize {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.workers.min(available).max(1)
    }

    /// Protects every path with the certificate stored at `certificate`.
    ///
    /// Fails up front only if the certificate cannot be loaded.
    pub async fn protect_all(
        &self,
        paths: Vec<PathBuf>,
        certificate: &Path,
        options: ProtectOptions,
        cancel: &CancelToken,
    ) -> FileVaultResult<BatchSummary> {
        let cert = self.certificates.load(certificate)?;
        let summary = self
            .run(paths, cancel, move |vault, path, cancel| {
                vault.protect_file(path, cert.as_ref(), &options, cancel)
            })
            .await;
        Ok(summary)
    }

    /// Unprotects every path with the certificate stored at `certificate`.
    pub async fn unprotect_all(
        &self,
        paths: Vec<PathBuf>,
        certificate: &Path,
        options: UnprotectOptions,
        cancel: &CancelToken,
    ) -> FileVaultResult<BatchSummary> {
        let cert = self.certificates.load(certificate)?;
        let summary = self
            .run(paths, cancel, move |vault, path, cancel| {
                vault.unprotect_file(path, cert.as_ref(), &options, cancel)
            })
            .await;
        Ok(summary)
    }

    async fn run<F>(&self, paths: Vec<PathBuf>, cancel: &CancelToken, job: F) -> BatchSummary
    where
        F: Fn(&FileVault, &Path, &CancelToken) -> FileVaultResult<PathBuf> + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let semaphore = Arc::new(Semaphore::new(self.parallelism()));
        let mut tasks = JoinSet::new();
        let mut sources = HashMap::new();

        for path in paths {
            // The semaphore is never closed, so acquisition only waits.
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let vault = Arc::clone(&self.vault);
            let job = Arc::clone(&job);
            let cancel = cancel.clone();
            let source = path.clone();

            let handle = tasks.spawn_blocking(move || {
                let _permit = permit;
                job(&vault, &source, &cancel)
            });
            sources.insert(handle.id(), path);
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, Ok(output))) => {
                    let source = sources.remove(&id).unwrap_or_default();
                    summary.succeeded.push(BatchSuccess { source, output });
                }
                Ok((id, Err(error))) => {
                    let source = sources.remove(&id).unwrap_or_default();
                    warn!("batch job failed for {}: {}", source.display(), error);
                    summary.failed.push(BatchFailure { source, error });
                }
                Err(join_error) => {
                    let source = sources.remove(&join_error.id()).unwrap_or_default();
                    warn!("batch worker for {} panicked: {}", source.display(), join_error);
                    summary.failed.push(BatchFailure {
                        source,
                        error: FileVaultError::Worker(join_error.to_string()),
                    });
                }
            }
        }

        info!(
            "batch finished: {} succeeded, {} failed",
            summary.succeeded.len(),
            summary.failed.len()
        );
        summary
    }
}
