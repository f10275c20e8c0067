//! Memoized certificate loading.

use crate::error::FileVaultResult;
use filevault_crypto::RsaCertificate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Caches parsed PEM certificates by canonical path.
///
/// Batch jobs share one cache so a key file is parsed once no matter how
/// many files it protects. Entries live until [`clear`](Self::clear) or the
/// cache is dropped.
#[derive(Debug, Default)]
pub struct CertificateCache {
    entries: RwLock<HashMap<PathBuf, Arc<RsaCertificate>>>,
}

impl CertificateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the certificate at `path`, parsing it on first use.
    pub fn load(&self, path: &Path) -> FileVaultResult<Arc<RsaCertificate>> {
        let key = std::fs::canonicalize(path)?;
        if let Some(cert) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(cert));
        }

        let pem = std::fs::read_to_string(&key)?;
        let cert = Arc::new(RsaCertificate::from_pem(&pem)?);
        debug!("loaded certificate {}", key.display());

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // A concurrent loader may have won; keep its entry.
        Ok(Arc::clone(entries.entry(key).or_insert(cert)))
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
