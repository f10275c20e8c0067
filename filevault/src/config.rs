//! Configuration for file-level operations.

use crate::error::{FileVaultError, FileVaultResult};
use filevault_crypto::{EngineConfig, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use filevault_erase::EraseConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by every operation of a [`FileVault`](crate::FileVault).
///
/// Any field may be omitted from a TOML file; missing fields take their
/// defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileVaultConfig {
    /// Plaintext bytes per cipher chunk (multiple of 16).
    pub chunk_size: usize,

    /// Overwrite passes for secure erase.
    pub erase_passes: u32,

    /// Erased files get timestamps up to this many days in the past.
    pub erase_lookback_days: u32,

    /// Record a SHA-256 of every erase pass.
    pub erase_verify: bool,

    /// Upper bound on concurrent batch jobs.
    pub workers: usize,

    /// Largest input accepted in RSA-only mode.
    pub rsa_only_max_input: u64,

    /// Extension appended to protected files, without the dot.
    pub extension: String,
}

impl Default for FileVaultConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            erase_passes: filevault_erase::DEFAULT_PASSES,
            erase_lookback_days: filevault_erase::DEFAULT_LOOKBACK_DAYS,
            erase_verify: true,
            workers: 4,
            rsa_only_max_input: filevault_crypto::rsa_only::DEFAULT_MAX_INPUT,
            extension: "enc".to_string(),
        }
    }
}

impl FileVaultConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> FileVaultResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: &Path) -> FileVaultResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> FileVaultResult<()> {
        if self.chunk_size == 0 || self.chunk_size % 16 != 0 {
            return Err(FileVaultError::Config(format!(
                "chunk_size {} must be a non-zero multiple of 16",
                self.chunk_size
            )));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(FileVaultError::Config(format!(
                "chunk_size {} exceeds {MAX_CHUNK_SIZE}",
                self.chunk_size
            )));
        }
        if self.erase_passes == 0 {
            return Err(FileVaultError::Config("erase_passes must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(FileVaultError::Config("workers must be at least 1".into()));
        }
        if self.extension.is_empty()
            || self
                .extension
                .chars()
                .any(|c| c == '.' || std::path::is_separator(c))
        {
            return Err(FileVaultError::Config(format!(
                "extension {:?} must be a non-empty name without dots or separators",
                self.extension
            )));
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            chunk_size: self.chunk_size,
            rsa_only_max_input: self.rsa_only_max_input,
        }
    }

    pub fn erase_config(&self) -> EraseConfig {
        EraseConfig {
            passes: self.erase_passes,
            lookback_days: self.erase_lookback_days,
            verify: self.erase_verify,
            ..EraseConfig::default()
        }
    }
}
