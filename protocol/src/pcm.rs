//! PCM16 frame codec
//!
//! Frames cross the relay channel as base64 text inside JSON envelopes.
//! Samples are mono, signed 16-bit, little-endian; a frame of `n` samples
//! is always `2 * n` bytes.

use base64::prelude::*;
use bytes::Bytes;
use thiserror::Error;

/// Base64 encode chunk length in bytes. Must stay a multiple of 3 so that
/// concatenated chunk output is byte-identical to whole-buffer encoding.
pub const ENCODE_CHUNK_LEN: usize = 32_766;

/// Frame codec failures
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("PCM16 byte stream has odd length: {0}")]
    OddByteLength(usize),
}

/// Converts samples to the little-endian byte stream sent on the wire.
pub fn pcm16_to_bytes(samples: &[i16]) -> Bytes {
    let mut buf = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        buf.extend_from_slice(&s.to_le_bytes());
    }
    Bytes::from(buf)
}

/// Parses a little-endian byte stream back into samples.
pub fn bytes_to_pcm16(bytes: &[u8]) -> Result<Vec<i16>, ProtocolError> {
    if bytes.len() % 2 != 0 {
        return Err(ProtocolError::OddByteLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect())
}

/// Base64 encodes a byte buffer chunk by chunk.
///
/// Large capture frames are encoded in [`ENCODE_CHUNK_LEN`] slices to keep
/// peak allocation per call bounded; because the chunk length is a multiple
/// of 3, the concatenated output equals a single whole-buffer encode.
pub fn encode_base64_chunked(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(ENCODE_CHUNK_LEN) {
        BASE64_STANDARD.encode_string(chunk, &mut out);
    }
    out
}

/// Decodes a base64 payload from an `audio` envelope.
pub fn decode_base64(data: &str) -> Result<Bytes, ProtocolError> {
    Ok(Bytes::from(BASE64_STANDARD.decode(data)?))
}
