//! Container envelope codec.
//!
//! Layout:
//!
//! ```text
//! hybrid:   [mode u8][wrapped_key_len u32 LE][wrapped_key][iv | nonce][cipher stream]
//! rsa-only: [mode u8][(len u32 LE, rsa block)*]
//! ```
//!
//! The mode byte alone decides how the rest is parsed. [`encode`] and
//! [`decode`] work on complete buffers; the engine uses
//! [`ContainerHeader::write_to`] / [`ContainerHeader::read_from`] to stream
//! the body without holding it in memory.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{AesMode, CipherMode};
use std::io::{Read, Write};

/// Upper bound on a wrapped key (a 32768-bit RSA modulus).
pub const MAX_WRAPPED_KEY_LEN: usize = 4096;

/// Size of the little-endian length prefixes used throughout the container.
pub const LEN_PREFIX_SIZE: usize = 4;

/// Everything before the cipher stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerHeader {
    Hybrid {
        mode: AesMode,
        wrapped_key: Vec<u8>,
        iv: Vec<u8>,
    },
    RsaOnly,
}

impl ContainerHeader {
    pub fn cipher_mode(&self) -> CipherMode {
        match self {
            ContainerHeader::Hybrid {
                mode: AesMode::Cbc, ..
            } => CipherMode::CbcHybrid,
            ContainerHeader::Hybrid {
                mode: AesMode::Gcm, ..
            } => CipherMode::GcmHybrid,
            ContainerHeader::RsaOnly => CipherMode::RsaOnly,
        }
    }

    /// Serialized header length in bytes.
    pub fn encoded_len(&self) -> usize {
        match self {
            ContainerHeader::Hybrid {
                wrapped_key, iv, ..
            } => 1 + LEN_PREFIX_SIZE + wrapped_key.len() + iv.len(),
            ContainerHeader::RsaOnly => 1,
        }
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&[self.cipher_mode().mode_byte()])?;
        if let ContainerHeader::Hybrid {
            wrapped_key, iv, ..
        } = self
        {
            writer.write_all(&(wrapped_key.len() as u32).to_le_bytes())?;
            writer.write_all(wrapped_key)?;
            writer.write_all(iv)?;
        }
        Ok(())
    }

    /// Reads a header, leaving `reader` positioned at the cipher stream.
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> CryptoResult<Self> {
        let mut mode_byte = [0u8; 1];
        reader
            .read_exact(&mut mode_byte)
            .map_err(|e| CryptoError::from_read(e, "mode byte"))?;

        let aes_mode = match CipherMode::try_from(mode_byte[0])?.aes_mode() {
            Some(mode) => mode,
            None => return Ok(ContainerHeader::RsaOnly),
        };

        let mut len_bytes = [0u8; LEN_PREFIX_SIZE];
        reader
            .read_exact(&mut len_bytes)
            .map_err(|e| CryptoError::from_read(e, "wrapped key length"))?;
        let key_len = checked_wrapped_key_len(u32::from_le_bytes(len_bytes))?;

        let mut wrapped_key = vec![0u8; key_len];
        reader
            .read_exact(&mut wrapped_key)
            .map_err(|e| CryptoError::from_read(e, "wrapped key"))?;

        let mut iv = vec![0u8; aes_mode.iv_len()];
        reader
            .read_exact(&mut iv)
            .map_err(|e| CryptoError::from_read(e, "iv"))?;

        Ok(ContainerHeader::Hybrid {
            mode: aes_mode,
            wrapped_key,
            iv,
        })
    }
}

/// Minimum container length for a mode, excluding any ciphertext.
pub fn min_len(mode: CipherMode) -> usize {
    match mode.aes_mode() {
        Some(aes) => 1 + LEN_PREFIX_SIZE + aes.iv_len(),
        None => 1,
    }
}

/// Assembles a complete container.
pub fn encode(header: &ContainerHeader, cipher_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(header.encoded_len() + cipher_bytes.len());
    // Writing into a Vec cannot fail.
    let _ = header.write_to(&mut out);
    out.extend_from_slice(cipher_bytes);
    out
}

/// Splits a complete container into its header and cipher bytes.
pub fn decode(bytes: &[u8]) -> CryptoResult<(ContainerHeader, &[u8])> {
    let (&mode_byte, rest) = bytes
        .split_first()
        .ok_or_else(|| CryptoError::Format("empty container".into()))?;
    let mode = CipherMode::try_from(mode_byte)?;

    let aes_mode = match mode.aes_mode() {
        Some(aes) => aes,
        None => return Ok((ContainerHeader::RsaOnly, rest)),
    };

    if bytes.len() < min_len(mode) {
        return Err(CryptoError::Format(format!(
            "container too short for {mode:?}: {} bytes, need at least {}",
            bytes.len(),
            min_len(mode)
        )));
    }

    let (len_bytes, rest) = rest.split_at(LEN_PREFIX_SIZE);
    let declared = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
    let key_len = checked_wrapped_key_len(declared)?;

    let iv_len = aes_mode.iv_len();
    if key_len + iv_len > rest.len() {
        return Err(CryptoError::Format(format!(
            "wrapped key length {key_len} exceeds remaining {} bytes",
            rest.len().saturating_sub(iv_len)
        )));
    }

    let (wrapped_key, rest) = rest.split_at(key_len);
    let (iv, body) = rest.split_at(iv_len);

    Ok((
        ContainerHeader::Hybrid {
            mode: aes_mode,
            wrapped_key: wrapped_key.to_vec(),
            iv: iv.to_vec(),
        },
        body,
    ))
}

fn checked_wrapped_key_len(declared: u32) -> CryptoResult<usize> {
    let len = declared as usize;
    if len == 0 || len > MAX_WRAPPED_KEY_LEN {
        return Err(CryptoError::Format(format!(
            "invalid wrapped key length {len}"
        )));
    }
    Ok(len)
}
