//! Cooperative cancellation for long-running stream operations.

use crate::error::{CryptoError, CryptoResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag checked between chunks.
///
/// Cloning shares the flag, so a caller keeps one clone and hands the other
/// to the operation.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Operations notice at the next chunk boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> CryptoResult<()> {
        if self.is_cancelled() {
            Err(CryptoError::Cancelled)
        } else {
            Ok(())
        }
    }
}
