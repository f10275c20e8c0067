//! Protect, unprotect and erase files on disk.
//!
//! Outputs are written to a temporary file next to their destination and
//! only published once the operation has fully succeeded, so a failed or
//! cancelled call never leaves a partial `.enc` file or partial plaintext
//! behind. Publishing never replaces an existing file.

use crate::config::FileVaultConfig;
use crate::error::{FileVaultError, FileVaultResult};
use filevault_crypto::{transport, CancelToken, Certificate, HybridEngine, Method};
use filevault_erase::{EraseReport, SecureEraser};
use std::ffi::OsString;
use std::fs::{File, TryLockError};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Options for [`FileVault::protect_file`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProtectOptions {
    pub method: Method,
    /// Write the container as Base64 text.
    pub base64: bool,
    /// Securely erase the plaintext once the container is published.
    pub delete_original: bool,
}

/// Options for [`FileVault::unprotect_file`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnprotectOptions {
    /// The container is stored as Base64 text.
    pub base64: bool,
    /// Remove the container once the plaintext is published.
    pub delete_original: bool,
    /// Replace the extension left after stripping the protected suffix.
    pub output_extension: Option<String>,
}

/// File-level front end over [`HybridEngine`] and [`SecureEraser`].
#[derive(Clone, Debug)]
pub struct FileVault {
    engine: HybridEngine,
    eraser: SecureEraser,
    extension: String,
}

impl Default for FileVault {
    fn default() -> Self {
        Self {
            engine: HybridEngine::default(),
            eraser: SecureEraser::default(),
            extension: FileVaultConfig::default().extension,
        }
    }
}

impl FileVault {
    pub fn new(config: &FileVaultConfig) -> FileVaultResult<Self> {
        config.validate()?;
        Ok(Self {
            engine: HybridEngine::new(config.engine_config())?,
            eraser: SecureEraser::new(config.erase_config())?,
            extension: config.extension.clone(),
        })
    }

    pub fn engine(&self) -> &HybridEngine {
        &self.engine
    }

    /// `<source>.<ext>`, with the extension appended rather than replaced.
    pub fn protected_path(&self, source: &Path) -> PathBuf {
        let mut name = OsString::from(source.as_os_str());
        name.push(".");
        name.push(&self.extension);
        PathBuf::from(name)
    }

    /// Inverse of [`protected_path`](Self::protected_path), optionally
    /// swapping the remaining extension for `output_extension`.
    pub fn unprotected_path(
        &self,
        container: &Path,
        output_extension: Option<&str>,
    ) -> FileVaultResult<PathBuf> {
        // Works on `OsStr` so names that are not valid UTF-8 round-trip.
        // The configured extension never contains a dot, so the last dot
        // always separates it from the stem.
        let has_suffix = container
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension));
        let stem = container
            .file_stem()
            .filter(|stem| has_suffix && !stem.is_empty() && *stem != "." && *stem != "..")
            .ok_or_else(|| {
                FileVaultError::Format(format!(
                    "{} does not end in .{}",
                    container.display(),
                    self.extension
                ))
            })?;

        let mut output = container.with_file_name(stem);
        if let Some(ext) = output_extension {
            output.set_extension(ext.trim_start_matches('.'));
        }
        Ok(output)
    }

    /// Encrypts `source` into `<source>.enc` and returns the output path.
    pub fn protect_file(
        &self,
        source: &Path,
        certificate: &dyn Certificate,
        options: &ProtectOptions,
        cancel: &CancelToken,
    ) -> FileVaultResult<PathBuf> {
        let destination = self.protected_path(source);
        ensure_absent(&destination)?;

        let input = open_source(source)?;
        let mut reader = BufReader::new(&input);
        let temp = write_temp(&destination, |out| {
            if options.base64 {
                let mut encoder = transport::encoding_writer(out);
                self.engine
                    .protect(options.method, certificate, &mut reader, &mut encoder, cancel)?;
                encoder.finish()?;
            } else {
                self.engine
                    .protect(options.method, certificate, &mut reader, out, cancel)?;
            }
            Ok(())
        })?;
        drop(reader);
        drop(input);

        publish(temp, &destination)?;
        info!("protected {} -> {}", source.display(), destination.display());

        if options.delete_original {
            self.eraser.erase(source)?;
        }
        Ok(destination)
    }

    /// Decrypts a `.enc` container and returns the plaintext path.
    pub fn unprotect_file(
        &self,
        container: &Path,
        certificate: &dyn Certificate,
        options: &UnprotectOptions,
        cancel: &CancelToken,
    ) -> FileVaultResult<PathBuf> {
        let destination = self.unprotected_path(container, options.output_extension.as_deref())?;
        ensure_absent(&destination)?;

        let input = open_source(container)?;
        let temp = write_temp(&destination, |out| {
            let reader = BufReader::new(&input);
            if options.base64 {
                let mut decoder = transport::decoding_reader(reader);
                self.engine.unprotect(certificate, &mut decoder, out, cancel)?;
            } else {
                let mut reader = reader;
                self.engine.unprotect(certificate, &mut reader, out, cancel)?;
            }
            Ok(())
        })?;
        drop(input);

        publish(temp, &destination)?;
        info!("unprotected {} -> {}", container.display(), destination.display());

        if options.delete_original {
            std::fs::remove_file(container)?;
        }
        Ok(destination)
    }

    /// Overwrites and removes `path` with the configured erase settings.
    pub fn securely_erase(&self, path: &Path) -> FileVaultResult<EraseReport> {
        Ok(self.eraser.erase(path)?)
    }
}

fn ensure_absent(path: &Path) -> FileVaultResult<()> {
    if path.try_exists()? {
        return Err(FileVaultError::DestinationExists(path.to_path_buf()));
    }
    Ok(())
}

/// Opens a source read-only under a shared lock so writers are kept out
/// while it is being read.
fn open_source(path: &Path) -> FileVaultResult<File> {
    if !path.is_file() {
        return Err(FileVaultError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("not a regular file: {}", path.display()),
        )));
    }
    let file = File::open(path)?;
    match file.try_lock_shared() {
        Ok(()) => {}
        Err(TryLockError::WouldBlock) => return Err(FileVaultError::Locked(path.to_path_buf())),
        Err(TryLockError::Error(err)) if err.kind() == io::ErrorKind::Unsupported => {
            warn!("file locks not supported here, reading {} unlocked", path.display());
        }
        Err(TryLockError::Error(err)) => return Err(err.into()),
    }
    Ok(file)
}

/// Runs `fill` against a buffered temp file in `destination`'s directory.
/// The temp file is deleted on any error.
fn write_temp<F>(destination: &Path, fill: F) -> FileVaultResult<NamedTempFile>
where
    F: FnOnce(&mut dyn Write) -> FileVaultResult<()>,
{
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut out = BufWriter::new(temp.as_file_mut());
        fill(&mut out)?;
        out.flush()?;
    }
    temp.as_file().sync_all()?;
    debug!("staged output at {}", temp.path().display());
    Ok(temp)
}

fn publish(temp: NamedTempFile, destination: &Path) -> FileVaultResult<()> {
    temp.persist_noclobber(destination).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            FileVaultError::DestinationExists(destination.to_path_buf())
        } else {
            FileVaultError::Io(e.error)
        }
    })?;
    Ok(())
}

/// Reads a protected file's raw container bytes, undoing Base64 transport
/// encoding when `base64` is set. Nothing is decrypted.
pub fn read_container(path: &Path, base64: bool) -> FileVaultResult<Vec<u8>> {
    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;
    if base64 {
        let text = String::from_utf8(raw)
            .map_err(|_| FileVaultError::Format(format!("{} is not Base64 text", path.display())))?;
        return Ok(transport::decode(&text)?);
    }
    Ok(raw)
}
