//! Base64 transport encoding for containers.
//!
//! Encoding is strict standard Base64 with padding and no line breaks.
//! Decoding first drops ASCII whitespace, since pasted or mailed text
//! routinely picks up newlines and indentation.

use crate::error::{CryptoError, CryptoResult};
use base64::engine::general_purpose::STANDARD;
use base64::read::DecoderReader;
use base64::write::EncoderWriter;
use base64::Engine;
use std::io::{Read, Write};

/// Encodes container bytes as a single Base64 line.
pub fn encode(container: &[u8]) -> String {
    STANDARD.encode(container)
}

/// Decodes Base64 text, ignoring any whitespace.
pub fn decode(text: &str) -> CryptoResult<Vec<u8>> {
    let compact: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| CryptoError::Format(format!("invalid base64: {e}")))
}

/// Wraps `writer` so everything written to it is Base64-encoded.
///
/// Call `finish()` on the returned writer to emit the final padded quantum.
pub fn encoding_writer<W: Write>(writer: W) -> EncoderWriter<'static, base64::engine::GeneralPurpose, W> {
    EncoderWriter::new(writer, &STANDARD)
}

/// Wraps `reader` so Base64 text (with arbitrary whitespace) is decoded on
/// the fly. Invalid input surfaces as an `InvalidData` I/O error.
pub fn decoding_reader<R: Read>(
    reader: R,
) -> DecoderReader<'static, base64::engine::GeneralPurpose, WhitespaceFilter<R>> {
    DecoderReader::new(WhitespaceFilter::new(reader), &STANDARD)
}

/// Reader adapter that drops ASCII whitespace.
pub struct WhitespaceFilter<R> {
    inner: R,
}

impl<R: Read> WhitespaceFilter<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for WhitespaceFilter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let byte = buf[i];
                if !byte.is_ascii_whitespace() {
                    buf[kept] = byte;
                    kept += 1;
                }
            }
            // A read that was all whitespace must not look like EOF.
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}
