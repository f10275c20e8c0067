//! Multi-pass overwrite and delete.

use crate::error::{EraseError, EraseResult};
use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use std::fs::{self, File, FileTimes, OpenOptions, TryLockError};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

pub const DEFAULT_PASSES: u32 = 5;
pub const DEFAULT_LOOKBACK_DAYS: u32 = 14;
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

const SECONDS_PER_DAY: i64 = 86_400;

/// Parameters for a secure erase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EraseConfig {
    /// Number of random overwrite passes. Must be at least 1.
    pub passes: u32,
    /// Timestamps are randomized within this many days before now.
    pub lookback_days: u32,
    /// Read each pass back and record its SHA-256.
    pub verify: bool,
    /// Overwrite buffer size. Memory use is bounded by this, not file size.
    pub block_size: usize,
}

impl Default for EraseConfig {
    fn default() -> Self {
        Self {
            passes: DEFAULT_PASSES,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            verify: true,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl EraseConfig {
    pub fn with_passes(passes: u32) -> Self {
        Self {
            passes,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> EraseResult<()> {
        if self.passes == 0 {
            return Err(EraseError::InvalidConfig(
                "at least one overwrite pass is required".into(),
            ));
        }
        if self.block_size == 0 {
            return Err(EraseError::InvalidConfig(
                "overwrite block size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Record of a single overwrite pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassReport {
    /// 1-based pass number.
    pub pass: u32,
    /// Access and modification time applied after the pass.
    pub timestamp: DateTime<Utc>,
    /// Hex SHA-256 of the file contents after the pass, when verifying.
    pub sha256: Option<String>,
}

/// Outcome of a completed erase. The file no longer exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EraseReport {
    pub path: PathBuf,
    /// File length that was overwritten on every pass.
    pub bytes: u64,
    pub passes: Vec<PassReport>,
}

/// Overwrites a file with fresh random data several times, then removes it.
#[derive(Clone, Debug, Default)]
pub struct SecureEraser {
    config: EraseConfig,
}

impl SecureEraser {
    pub fn new(config: EraseConfig) -> EraseResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EraseConfig {
        &self.config
    }

    /// Erases `path`.
    ///
    /// The file is locked exclusively for the whole operation; if another
    /// handle holds a lock the call fails with [`EraseError::Locked`]
    /// without touching the contents.
    pub fn erase(&self, path: &Path) -> EraseResult<EraseReport> {
        let metadata = fs::symlink_metadata(path)?;
        if !metadata.is_file() {
            return Err(EraseError::NotAFile(path.to_path_buf()));
        }

        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        lock_exclusive(&file, path)?;

        let bytes = file.metadata()?.len();
        let mut block = vec![0u8; self.config.block_size];
        let mut passes = Vec::with_capacity(self.config.passes as usize);

        for pass in 1..=self.config.passes {
            overwrite(&mut file, bytes, &mut block)?;
            file.sync_all()?;

            let timestamp = random_timestamp(Utc::now(), self.config.lookback_days);
            let time = SystemTime::from(timestamp);
            file.set_times(FileTimes::new().set_accessed(time).set_modified(time))?;

            let sha256 = if self.config.verify {
                Some(hash_contents(&mut file, &mut block)?)
            } else {
                None
            };

            debug!("erase pass {}/{} complete ({} bytes)", pass, self.config.passes, bytes);
            passes.push(PassReport {
                pass,
                timestamp,
                sha256,
            });
        }

        file.set_len(0)?;
        file.sync_all()?;
        // Release the handle before removal; Windows refuses to delete open files.
        drop(file);
        fs::remove_file(path)?;

        info!("securely erased {} ({} bytes, {} passes)", path.display(), bytes, passes.len());
        Ok(EraseReport {
            path: path.to_path_buf(),
            bytes,
            passes,
        })
    }
}

/// Convenience wrapper: erase with default settings and `passes` passes.
pub fn erase(path: &Path, passes: u32) -> EraseResult<EraseReport> {
    SecureEraser::new(EraseConfig::with_passes(passes))?.erase(path)
}

fn lock_exclusive(file: &File, path: &Path) -> EraseResult<()> {
    match file.try_lock() {
        Ok(()) => Ok(()),
        Err(TryLockError::WouldBlock) => Err(EraseError::Locked(path.to_path_buf())),
        Err(TryLockError::Error(err)) if err.kind() == io::ErrorKind::Unsupported => {
            warn!(
                "file locks not supported here, erasing {} without a lock",
                path.display()
            );
            Ok(())
        }
        Err(TryLockError::Error(err)) => Err(err.into()),
    }
}

/// Writes `len` fresh random bytes from the start of `file`.
fn overwrite(file: &mut File, len: u64, block: &mut [u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(0))?;
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(block.len() as u64) as usize;
        OsRng.fill_bytes(&mut block[..n]);
        file.write_all(&block[..n])?;
        remaining -= n as u64;
    }
    file.flush()
}

fn hash_contents(file: &mut File, block: &mut [u8]) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut hasher = Sha256::new();
    loop {
        let n = file.read(block)?;
        if n == 0 {
            break;
        }
        hasher.update(&block[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Uniform random instant in `[now - lookback_days, now]`, second resolution.
fn random_timestamp(now: DateTime<Utc>, lookback_days: u32) -> DateTime<Utc> {
    let window = i64::from(lookback_days) * SECONDS_PER_DAY;
    let offset = OsRng.gen_range(0..=window);
    now - TimeDelta::seconds(offset)
}
