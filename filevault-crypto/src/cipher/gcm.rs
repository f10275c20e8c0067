//! Chunked AES-GCM over byte streams.
//!
//! Every chunk is its own AEAD message:
//!
//! ```text
//! [ciphertext_len u32 LE][ciphertext][tag 16]   repeated until input ends
//! ```
//!
//! Chunk `i` is sealed under `base_nonce XOR i`, with `i` as a big-endian
//! `u32` folded into the last four nonce bytes, so no (key, nonce) pair
//! repeats within a file. The associated data is one byte, `0x01` on the
//! final chunk and `0x00` elsewhere, which makes dropped trailing chunks and
//! appended chunks fail authentication. Empty input still yields one (empty)
//! final chunk.

use crate::cancel::CancelToken;
use crate::container::LEN_PREFIX_SIZE;
use crate::error::{CryptoError, CryptoResult};
use crate::key::{AesKeySize, GCM_NONCE_SIZE, GCM_TAG_SIZE, KeyMaterial};
use crate::stream::{read_full, read_len_prefix, StreamStats, MAX_CHUNK_SIZE};
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};
use std::io::{Read, Write};
use zeroize::Zeroizing;

type Aes192Gcm = AesGcm<aes::Aes192, U12>;

const FINAL_CHUNK: u8 = 0x01;
const INNER_CHUNK: u8 = 0x00;

/// Nonce for chunk `index`: the base nonce with `index` (big-endian) XORed
/// into its last four bytes.
pub fn derive_nonce(base: &[u8; GCM_NONCE_SIZE], index: u32) -> [u8; GCM_NONCE_SIZE] {
    let mut nonce = *base;
    for (byte, counter) in nonce[GCM_NONCE_SIZE - 4..]
        .iter_mut()
        .zip(index.to_be_bytes())
    {
        *byte ^= counter;
    }
    nonce
}

/// Encrypts `reader` into a sequence of authenticated chunk records.
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
    let base = base_nonce(material)?;
    match key_size(material)? {
        AesKeySize::Aes128 => {
            encrypt_with::<Aes128Gcm, _, _>(material.key(), &base, reader, writer, chunk_size, cancel)
        }
        AesKeySize::Aes192 => {
            encrypt_with::<Aes192Gcm, _, _>(material.key(), &base, reader, writer, chunk_size, cancel)
        }
        AesKeySize::Aes256 => {
            encrypt_with::<Aes256Gcm, _, _>(material.key(), &base, reader, writer, chunk_size, cancel)
        }
    }
}

/// Verifies and decrypts chunk records.
///
/// A chunk's plaintext is written only after its tag verifies; the first
/// failing chunk stops processing with [`CryptoError::Crypto`].
pub fn decrypt_stream<R, W>(
    material: &KeyMaterial,
    reader: &mut R,
    writer: &mut W,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let base = base_nonce(material)?;
    match key_size(material)? {
        AesKeySize::Aes128 => decrypt_with::<Aes128Gcm, _, _>(material.key(), &base, reader, writer, cancel),
        AesKeySize::Aes192 => decrypt_with::<Aes192Gcm, _, _>(material.key(), &base, reader, writer, cancel),
        AesKeySize::Aes256 => decrypt_with::<Aes256Gcm, _, _>(material.key(), &base, reader, writer, cancel),
    }
}

fn base_nonce(material: &KeyMaterial) -> CryptoResult<[u8; GCM_NONCE_SIZE]> {
    material
        .iv()
        .try_into()
        .map_err(|_| CryptoError::Format("GCM nonce must be 12 bytes".into()))
}

fn key_size(material: &KeyMaterial) -> CryptoResult<AesKeySize> {
    material
        .key_size()
        .ok_or_else(|| CryptoError::Certificate("unwrapped key has an invalid AES length".into()))
}

fn encrypt_with<A, R, W>(
    key: &[u8],
    base: &[u8; GCM_NONCE_SIZE],
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    A: AeadInPlace + KeyInit,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let cipher = A::new_from_slice(key)
        .map_err(|_| CryptoError::Format("invalid GCM key length".into()))?;
    let mut current = Zeroizing::new(vec![0u8; chunk_size]);
    let mut next = Zeroizing::new(vec![0u8; chunk_size]);
    let mut current_len = read_full(reader, &mut current)?;
    let mut index: u32 = 0;
    let mut stats = StreamStats::default();

    loop {
        cancel.check()?;

        // Look one chunk ahead so the final chunk can be flagged.
        let mut next_len = 0;
        if current_len == chunk_size {
            next_len = read_full(reader, &mut next)?;
        }
        let is_last = next_len == 0;
        let aad = [if is_last { FINAL_CHUNK } else { INNER_CHUNK }];

        let nonce = derive_nonce(base, index);
        let tag = cipher
            .encrypt_in_place_detached(
                GenericArray::from_slice(&nonce),
                &aad,
                &mut current[..current_len],
            )
            .map_err(|_| CryptoError::Crypto)?;

        writer.write_all(&(current_len as u32).to_le_bytes())?;
        writer.write_all(&current[..current_len])?;
        writer.write_all(tag.as_slice())?;

        stats.plaintext_bytes += current_len as u64;
        stats.ciphertext_bytes += (LEN_PREFIX_SIZE + current_len + GCM_TAG_SIZE) as u64;
        stats.chunks += 1;

        if is_last {
            return Ok(stats);
        }

        index = index.checked_add(1).ok_or(CryptoError::Capacity {
            size: stats.plaintext_bytes,
            limit: u64::from(u32::MAX) * chunk_size as u64,
        })?;
        std::mem::swap(&mut current, &mut next);
        current_len = next_len;
    }
}

fn decrypt_with<A, R, W>(
    key: &[u8],
    base: &[u8; GCM_NONCE_SIZE],
    reader: &mut R,
    writer: &mut W,
    cancel: &CancelToken,
) -> CryptoResult<StreamStats>
where
    A: AeadInPlace + KeyInit,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let cipher = A::new_from_slice(key)
        .map_err(|_| CryptoError::Format("invalid GCM key length".into()))?;
    let mut buf = Zeroizing::new(Vec::<u8>::new());
    let mut stats = StreamStats::default();

    // No records at all means the final chunk was cut off.
    let mut pending_len = match read_len_prefix(reader)? {
        Some(len) => len,
        None => return Err(CryptoError::Crypto),
    };
    let mut index: u32 = 0;

    loop {
        cancel.check()?;

        let len = pending_len as usize;
        if len > MAX_CHUNK_SIZE {
            return Err(CryptoError::Format(format!(
                "chunk {index} declares {len} bytes, limit is {MAX_CHUNK_SIZE}"
            )));
        }
        buf.resize(len, 0);
        reader
            .read_exact(&mut buf[..len])
            .map_err(|e| CryptoError::from_read(e, "chunk ciphertext"))?;
        let mut tag = [0u8; GCM_TAG_SIZE];
        reader
            .read_exact(&mut tag)
            .map_err(|e| CryptoError::from_read(e, "chunk tag"))?;

        let following = read_len_prefix(reader)?;
        let aad = [if following.is_none() { FINAL_CHUNK } else { INNER_CHUNK }];

        let nonce = derive_nonce(base, index);
        cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(&nonce),
                &aad,
                &mut buf[..len],
                GenericArray::from_slice(&tag),
            )
            .map_err(|_| CryptoError::Crypto)?;

        writer.write_all(&buf[..len])?;
        stats.plaintext_bytes += len as u64;
        stats.ciphertext_bytes += (LEN_PREFIX_SIZE + len + GCM_TAG_SIZE) as u64;
        stats.chunks += 1;

        match following {
            None => return Ok(stats),
            Some(next_len) => {
                pending_len = next_len;
                index = index
                    .checked_add(1)
                    .ok_or_else(|| CryptoError::Format("too many GCM chunks".into()))?;
            }
        }
    }
}
