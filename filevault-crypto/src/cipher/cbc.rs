//! AES-CBC with PKCS7 padding over byte streams.
//!
//! CBC has no MAC: corruption and tampering are indistinguishable and both
//! surface as [`CryptoError::Crypto`] once the final padding check fails.
//! Callers that need tamper evidence use GCM.

use crate::cancel::CancelToken;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{AesKeySize, KeyMaterial};
use crate::stream::{read_full, StreamStats};
use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::io::{Read, Write};
use zeroize::{Zeroize, Zeroizing};

/// AES block length.
pub const BLOCK_SIZE: usize = 16;

/// Encrypts `reader` into `writer`, `chunk_size` bytes at a time.
///
/// `chunk_size` must be a non-zero multiple of [`BLOCK_SIZE`].
pub fn encrypt_stream<R, W>(
    material: &KeyMaterial,
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    match key_size(material)? {
        AesKeySize::Aes128 => {
            encrypt_with::<cbc::Encryptor<Aes128>, _, _>(material, reader, writer, chunk_size, cancel)
        }
        AesKeySize::Aes192 => {
            encrypt_with::<cbc::Encryptor<Aes192>, _, _>(material, reader, writer, chunk_size, cancel)
        }
        AesKeySize::Aes256 => {
            encrypt_with::<cbc::Encryptor<Aes256>, _, _>(material, reader, writer, chunk_size, cancel)
        }
    }
}

/// Decrypts a CBC cipher stream, stripping PKCS7 padding from the last block.
pub fn decrypt_stream<R, W>(
    material: &KeyMaterial,
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    match key_size(material)? {
        AesKeySize::Aes128 => {
            decrypt_with::<cbc::Decryptor<Aes128>, _, _>(material, reader, writer, chunk_size, cancel)
        }
        AesKeySize::Aes192 => {
            decrypt_with::<cbc::Decryptor<Aes192>, _, _>(material, reader, writer, chunk_size, cancel)
        }
        AesKeySize::Aes256 => {
            decrypt_with::<cbc::Decryptor<Aes256>, _, _>(material, reader, writer, chunk_size, cancel)
        }
    }
}

fn key_size(material: &KeyMaterial) -> CryptoResult<AesKeySize> {
    material
        .key_size()
        .ok_or_else(|| CryptoError::Certificate("unwrapped key has an invalid AES length".into()))
}

fn encrypt_with<E, R, W>(
    material: &KeyMaterial,
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    E: KeyIvInit + BlockEncryptMut,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut encryptor = E::new_from_slices(material.key(), material.iv())
        .map_err(|_| CryptoError::Format("invalid CBC key or IV length".into()))?;
    let mut buf = Zeroizing::new(vec![0u8; chunk_size]);
    let mut stats = StreamStats::default();

    loop {
        cancel.check()?;
        let n = read_full(reader, &mut buf)?;
        let full = n - n % BLOCK_SIZE;

        for block in buf[..full].chunks_exact_mut(BLOCK_SIZE) {
            encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        writer.write_all(&buf[..full])?;
        stats.plaintext_bytes += n as u64;
        stats.ciphertext_bytes += full as u64;
        stats.chunks += 1;

        if n < buf.len() {
            let tail = n - full;
            let mut last = [0u8; BLOCK_SIZE];
            last[..tail].copy_from_slice(&buf[full..n]);
            let padded = encryptor
                .encrypt_padded_mut::<Pkcs7>(&mut last, tail)
                .map_err(|_| CryptoError::Crypto)?;
            writer.write_all(padded)?;
            last.zeroize();
            stats.ciphertext_bytes += BLOCK_SIZE as u64;
            return Ok(stats);
        }
    }
}

fn decrypt_with<D, R, W>(
    material: &KeyMaterial,
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    D: KeyIvInit + BlockDecryptMut,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut decryptor = D::new_from_slices(material.key(), material.iv())
        .map_err(|_| CryptoError::Format("invalid CBC key or IV length".into()))?;

    // One extra block so the final block is held back until EOF is known.
    let mut buf = Zeroizing::new(vec![0u8; chunk_size + BLOCK_SIZE]);
    let mut filled = 0usize;
    let mut stats = StreamStats::default();

    loop {
        cancel.check()?;
        let n = read_full(reader, &mut buf[filled..])
            .map_err(|e| CryptoError::from_read(e, "cipher stream"))?;
        filled += n;
        if filled < buf.len() {
            break;
        }

        let ready = filled - BLOCK_SIZE;
        for block in buf[..ready].chunks_exact_mut(BLOCK_SIZE) {
            decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        writer.write_all(&buf[..ready])?;
        stats.ciphertext_bytes += ready as u64;
        stats.plaintext_bytes += ready as u64;
        stats.chunks += 1;

        buf.copy_within(ready..filled, 0);
        filled = BLOCK_SIZE;
    }

    if filled == 0 || filled % BLOCK_SIZE != 0 {
        return Err(CryptoError::Crypto);
    }

    let body = filled - BLOCK_SIZE;
    for block in buf[..body].chunks_exact_mut(BLOCK_SIZE) {
        decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    let last_len = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf[body..filled])
        .map_err(|_| CryptoError::Crypto)?
        .len();

    writer.write_all(&buf[..body + last_len])?;
    stats.ciphertext_bytes += filled as u64;
    stats.plaintext_bytes += (body + last_len) as u64;
    stats.chunks += 1;
    Ok(stats)
}
