//! Direct RSA-OAEP encryption for small payloads.
//!
//! The plaintext is split into blocks of at most
//! `modulus_len - 2 * 32 - 2` bytes, and each block is encrypted on its own:
//!
//! ```text
//! [(block_len u32 LE, rsa_block)*]
//! ```

use crate::cancel::CancelToken;
use crate::certificate::{max_oaep_payload, Certificate};
use crate::container::{LEN_PREFIX_SIZE, MAX_WRAPPED_KEY_LEN};
use crate::error::{CryptoError, CryptoResult};
use crate::stream::{read_full, read_len_prefix, StreamStats};
use std::io::{Read, Write};
use zeroize::Zeroizing;

/// Default upper bound on RSA-only input.
pub const DEFAULT_MAX_INPUT: u64 = 64 * 1024;

/// Plaintext bytes per RSA block for `certificate`.
pub fn block_capacity(certificate: &dyn Certificate) -> CryptoResult<usize> {
    let capacity = max_oaep_payload(certificate.key_size_bytes());
    if capacity == 0 {
        return Err(CryptoError::Capacity {
            size: 1,
            limit: 0,
        });
    }
    Ok(capacity)
}

/// Encrypts `reader` block by block with the certificate's public key.
///
/// Fails with `Capacity` once more than `max_input` bytes have been read.
pub fn encrypt_stream<R, W>(
    certificate: &dyn Certificate,
    reader: &mut R,
    writer: &mut W,
    max_input: u64,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let capacity = block_capacity(certificate)?;
    let mut block = Zeroizing::new(vec![0u8; capacity]);
    let mut stats = StreamStats::default();

    loop {
        cancel.check()?;
        let n = read_full(reader, &mut block)?;
        if n == 0 {
            return Ok(stats);
        }

        stats.plaintext_bytes += n as u64;
        if stats.plaintext_bytes > max_input {
            return Err(CryptoError::Capacity {
                size: stats.plaintext_bytes,
                limit: max_input,
            });
        }

        let ciphertext = certificate.encrypt(&block[..n])?;
        writer.write_all(&(ciphertext.len() as u32).to_le_bytes())?;
        writer.write_all(&ciphertext)?;
        stats.ciphertext_bytes += (LEN_PREFIX_SIZE + ciphertext.len()) as u64;
        stats.chunks += 1;

        if n < capacity {
            return Ok(stats);
        }
    }
}

/// Decrypts RSA blocks with the certificate's private key.
pub fn decrypt_stream<R, W>(
    certificate: &dyn Certificate,
    reader: &mut R,
    writer: &mut W,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut stats = StreamStats::default();
    let mut block = Vec::new();

    while let Some(declared) = read_len_prefix(reader)? {
        cancel.check()?;
        let len = declared as usize;
        if len == 0 || len > MAX_WRAPPED_KEY_LEN {
            return Err(CryptoError::Format(format!(
                "RSA block {} has invalid length {len}",
                stats.chunks
            )));
        }

        block.resize(len, 0);
        reader
            .read_exact(&mut block)
            .map_err(|e| CryptoError::from_read(e, "RSA block"))?;

        // Once a block has opened, the key is known to match; a later
        // failure means the container was altered.
        let plaintext = certificate.decrypt(&block).map_err(|e| match e {
            CryptoError::Certificate(_) if stats.chunks > 0 => CryptoError::Crypto,
            other => other,
        })?;
        writer.write_all(&plaintext)?;
        stats.ciphertext_bytes += (LEN_PREFIX_SIZE + len) as u64;
        stats.plaintext_bytes += plaintext.len() as u64;
        stats.chunks += 1;
    }

    Ok(stats)
}
