//! Hybrid encryption engine.
//!
//! Protect: generate an AES key and IV/nonce, wrap the key with the
//! certificate, write the container header, then stream the plaintext
//! through the selected cipher. Unprotect reverses this, taking the cipher
//! path from the container's mode byte alone.
//!
//! Key material lives only inside a single call and is wiped when it goes
//! out of scope, whether the call succeeds, fails or is cancelled.

use crate::cancel::CancelToken;
use crate::certificate::Certificate;
use crate::container::ContainerHeader;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{AesKeySize, AesMode, CipherMode, KeyMaterial, Method};
use crate::cipher::{self, cbc, gcm};
use crate::rsa_only;
use crate::stream::{StreamStats, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};
use std::io::{Read, Write};
use tracing::{debug, error};
use zeroize::Zeroizing;

/// Tunables for the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Plaintext bytes per cipher chunk. Must be a multiple of 16.
    pub chunk_size: usize,
    /// Largest input accepted by [`Method::RsaOnly`].
    pub rsa_only_max_input: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            rsa_only_max_input: rsa_only::DEFAULT_MAX_INPUT,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> CryptoResult<()> {
        if self.chunk_size == 0 || self.chunk_size % cipher::BLOCK_SIZE != 0 {
            return Err(CryptoError::InvalidConfig(format!(
                "chunk size {} must be a non-zero multiple of {}",
                self.chunk_size,
                cipher::BLOCK_SIZE
            )));
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(CryptoError::InvalidConfig(format!(
                "chunk size {} exceeds {MAX_CHUNK_SIZE}",
                self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Lifecycle of a single protect or unprotect call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    Reading,
    KeyWrap,
    KeyUnwrap,
    Transforming,
    Finalizing,
    Done,
    Failed,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationState::Done | OperationState::Failed)
    }

    /// Whether `self -> next` is a legal step.
    ///
    /// RSA-only containers have no wrapped key, so `Reading` may go straight
    /// to `Transforming`. Any live state may fail.
    pub fn can_transition_to(self, next: OperationState) -> bool {
        use OperationState::*;
        match (self, next) {
            (Done | Failed, _) => false,
            (_, Failed) => true,
            (Idle, Reading) => true,
            (Reading, KeyWrap | KeyUnwrap | Transforming) => true,
            (KeyWrap | KeyUnwrap, Transforming) => true,
            (Transforming, Finalizing) => true,
            (Finalizing, Done) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Protect,
    Unprotect,
}

/// State tracker for one engine call.
#[derive(Debug)]
struct Operation {
    direction: Direction,
    state: OperationState,
}

impl Operation {
    fn new(direction: Direction) -> Self {
        Self {
            direction,
            state: OperationState::Idle,
        }
    }

    fn advance(&mut self, next: OperationState) {
        if !self.state.can_transition_to(next) {
            error!(
                "illegal {:?} transition {:?} -> {:?}",
                self.direction, self.state, next
            );
            debug_assert!(false, "illegal transition {:?} -> {next:?}", self.state);
        }
        debug!("{:?}: {:?} -> {:?}", self.direction, self.state, next);
        self.state = next;
    }

    fn finish<T>(&mut self, result: &CryptoResult<T>) {
        match result {
            Ok(_) => self.advance(OperationState::Done),
            Err(e) => {
                debug!("{:?} failed in {:?}: {e}", self.direction, self.state);
                self.advance(OperationState::Failed);
            }
        }
    }
}

/// Outcome of a successful protect or unprotect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperationSummary {
    pub cipher_mode: CipherMode,
    /// AES key size for hybrid containers.
    pub key_size: Option<AesKeySize>,
    pub stats: StreamStats,
    pub final_state: OperationState,
}

/// Orchestrates certificate, cipher and container codec.
#[derive(Clone, Debug, Default)]
pub struct HybridEngine {
    config: EngineConfig,
}

impl HybridEngine {
    pub fn new(config: EngineConfig) -> CryptoResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Encrypts `reader` into a container written to `writer`.
    pub fn protect<R, W>(
        &self,
        method: Method,
        certificate: &dyn Certificate,
        reader: &mut R,
        writer: &mut W,
        cancel: &CancelToken,
    ) -> CryptoResult<OperationSummary>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut op = Operation::new(Direction::Protect);
        let result = self.run_protect(&mut op, method, certificate, reader, writer, cancel);
        op.finish(&result);
        result.map(|(key_size, stats)| OperationSummary {
            cipher_mode: method.cipher_mode(),
            key_size,
            stats,
            final_state: op.state,
        })
    }

    /// Decrypts a container read from `reader` into `writer`.
    ///
    /// The cipher path is chosen by the container's mode byte; nothing
    /// supplied by the caller can override it.
    pub fn unprotect<R, W>(
        &self,
        certificate: &dyn Certificate,
        reader: &mut R,
        writer: &mut W,
        cancel: &CancelToken,
    ) -> CryptoResult<OperationSummary>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut op = Operation::new(Direction::Unprotect);
        let result = self.run_unprotect(&mut op, certificate, reader, writer, cancel);
        op.finish(&result);
        result.map(|(cipher_mode, key_size, stats)| OperationSummary {
            cipher_mode,
            key_size,
            stats,
            final_state: op.state,
        })
    }

    /// In-memory [`protect`](Self::protect).
    pub fn protect_bytes(
        &self,
        method: Method,
        certificate: &dyn Certificate,
        plaintext: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let mut container = Vec::new();
        self.protect(
            method,
            certificate,
            &mut &plaintext[..],
            &mut container,
            &CancelToken::new(),
        )?;
        Ok(container)
    }

    /// In-memory [`unprotect`](Self::unprotect). On failure any plaintext
    /// produced so far is wiped, never returned.
    pub fn unprotect_bytes(
        &self,
        certificate: &dyn Certificate,
        container: &[u8],
    ) -> CryptoResult<Vec<u8>> {
        let mut plaintext = Zeroizing::new(Vec::new());
        self.unprotect(
            certificate,
            &mut &container[..],
            &mut *plaintext,
            &CancelToken::new(),
        )?;
        Ok(std::mem::take(&mut *plaintext))
    }

    fn run_protect<R, W>(
        &self,
        op: &mut Operation,
        method: Method,
        certificate: &dyn Certificate,
        reader: &mut R,
        writer: &mut W,
        cancel: &CancelToken,
    ) -> CryptoResult<(Option<AesKeySize>, StreamStats)>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        op.advance(OperationState::Reading);
        cancel.check()?;

        let (key_size, stats) = match method {
            Method::Hybrid { key_size, mode } => {
                op.advance(OperationState::KeyWrap);
                let material = KeyMaterial::generate(key_size, mode);
                let header = ContainerHeader::Hybrid {
                    mode,
                    wrapped_key: certificate.encrypt(material.key())?,
                    iv: material.iv().to_vec(),
                };
                header.write_to(writer)?;

                op.advance(OperationState::Transforming);
                let stats = match mode {
                    AesMode::Cbc => {
                        cbc::encrypt_stream(&material, reader, writer, self.config.chunk_size, cancel)?
                    }
                    AesMode::Gcm => {
                        gcm::encrypt_stream(&material, reader, writer, self.config.chunk_size, cancel)?
                    }
                };
                (Some(key_size), stats)
            }
            Method::RsaOnly => {
                // Fail on an undersized key before anything is written.
                rsa_only::block_capacity(certificate)?;
                ContainerHeader::RsaOnly.write_to(writer)?;

                op.advance(OperationState::Transforming);
                let stats = rsa_only::encrypt_stream(
                    certificate,
                    reader,
                    writer,
                    self.config.rsa_only_max_input,
                    cancel,
                )?;
                (None, stats)
            }
        };

        op.advance(OperationState::Finalizing);
        writer.flush()?;
        debug!(
            "protected {} bytes into {} chunks ({:?})",
            stats.plaintext_bytes,
            stats.chunks,
            method.cipher_mode()
        );
        Ok((key_size, stats))
    }

    fn run_unprotect<R, W>(
        &self,
        op: &mut Operation,
        certificate: &dyn Certificate,
        reader: &mut R,
        writer: &mut W,
        cancel: &CancelToken,
    ) -> CryptoResult<(CipherMode, Option<AesKeySize>, StreamStats)>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        op.advance(OperationState::Reading);
        if !certificate.has_private_key() {
            return Err(CryptoError::Certificate(
                "certificate has no private key".into(),
            ));
        }
        cancel.check()?;

        let header = ContainerHeader::read_from(reader)?;
        let cipher_mode = header.cipher_mode();

        let (key_size, stats) = match header {
            ContainerHeader::Hybrid {
                mode,
                wrapped_key,
                iv,
            } => {
                op.advance(OperationState::KeyUnwrap);
                let key = certificate.decrypt(&wrapped_key)?;
                let key_size = AesKeySize::from_key_len(key.len()).ok_or_else(|| {
                    CryptoError::Certificate("unwrapped key has an invalid AES length".into())
                })?;
                let material = KeyMaterial::from_parts(&key, &iv);
                drop(key);

                op.advance(OperationState::Transforming);
                let stats = match mode {
                    AesMode::Cbc => {
                        cbc::decrypt_stream(&material, reader, writer, self.config.chunk_size, cancel)?
                    }
                    AesMode::Gcm => gcm::decrypt_stream(&material, reader, writer, cancel)?,
                };
                (Some(key_size), stats)
            }
            ContainerHeader::RsaOnly => {
                op.advance(OperationState::Transforming);
                (None, rsa_only::decrypt_stream(certificate, reader, writer, cancel)?)
            }
        };

        op.advance(OperationState::Finalizing);
        writer.flush()?;
        debug!(
            "unprotected {} bytes from {} chunks ({cipher_mode:?})",
            stats.plaintext_bytes, stats.chunks
        );
        Ok((cipher_mode, key_size, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperationState::*;

    #[test]
    fn legal_protect_path() {
        let path = [Idle, Reading, KeyWrap, Transforming, Finalizing, Done];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn rsa_only_skips_key_step() {
        assert!(Reading.can_transition_to(Transforming));
    }

    #[test]
    fn terminal_states_are_final() {
        for next in [Idle, Reading, Transforming, Done, Failed] {
            assert!(!Done.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(Done.is_terminal());
        assert!(!Finalizing.is_terminal());
    }

    #[test]
    fn any_live_state_can_fail() {
        for state in [Idle, Reading, KeyWrap, KeyUnwrap, Transforming, Finalizing] {
            assert!(state.can_transition_to(Failed));
        }
    }

    #[test]
    fn skipping_steps_is_illegal() {
        assert!(!Idle.can_transition_to(Transforming));
        assert!(!KeyWrap.can_transition_to(Done));
        assert!(!Transforming.can_transition_to(Done));
    }

    #[test]
    fn config_rejects_unaligned_chunks() {
        let config = EngineConfig {
            chunk_size: 1000,
            ..EngineConfig::default()
        };
        assert!(matches!(HybridEngine::new(config), Err(CryptoError::InvalidConfig(_))));
    }

    #[test]
    fn config_rejects_oversized_chunks() {
        let config = EngineConfig {
            chunk_size: MAX_CHUNK_SIZE + 16,
            ..EngineConfig::default()
        };
        assert!(HybridEngine::new(config).is_err());
    }
}
