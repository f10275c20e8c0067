//! Secure deletion of plaintext sources.
//!
//! Each pass overwrites the whole file with fresh OS randomness, syncs it to
//! disk and moves its access and modification times to a random instant in
//! the recent past. With verification on, every pass records a SHA-256 of
//! what actually landed on disk. After the last pass the file is truncated
//! and removed.
//!
//! Overwriting in place does not defeat copy-on-write filesystems, SSD wear
//! levelling or snapshots.

pub mod eraser;
mod error;

pub use eraser::{
    erase, EraseConfig, EraseReport, PassReport, SecureEraser, DEFAULT_BLOCK_SIZE,
    DEFAULT_LOOKBACK_DAYS, DEFAULT_PASSES,
};
pub use error::{EraseError, EraseResult};
