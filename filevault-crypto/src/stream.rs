//! Small helpers for chunked stream processing.

use crate::container::LEN_PREFIX_SIZE;
use crate::error::{CryptoError, CryptoResult};
use std::io::{ErrorKind, Read};

/// Default plaintext chunk size for streamed ciphers.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Largest accepted chunk, on both the writing and the reading side.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Byte and chunk counts for one streamed transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub plaintext_bytes: u64,
    pub ciphertext_bytes: u64,
    pub chunks: u64,
}

/// Reads until `buf` is full or the reader is exhausted.
///
/// Returns the number of bytes read; anything less than `buf.len()` means
/// end of stream.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads a record's little-endian length prefix; `None` at a clean end of
/// stream, `Format` if the stream stops inside the prefix.
pub(crate) fn read_len_prefix<R: Read + ?Sized>(reader: &mut R) -> CryptoResult<Option<u32>> {
    let mut len_bytes = [0u8; LEN_PREFIX_SIZE];
    let n = read_full(reader, &mut len_bytes)
        .map_err(|e| CryptoError::from_read(e, "record length"))?;
    match n {
        0 => Ok(None),
        LEN_PREFIX_SIZE => Ok(Some(u32::from_le_bytes(len_bytes))),
        _ => Err(CryptoError::Format(
            "container truncated inside a record length".into(),
        )),
    }
}
