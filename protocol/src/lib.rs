//! Shared wire protocol for the voxrelay gateway and client
//!
//! Defines the JSON envelope vocabulary spoken over the relay WebSocket
//! channel, plus the PCM16 frame codec (byte/base64 conversion) and WAV
//! container wrapping used on both ends of the channel.

pub mod envelope;
pub mod pcm;
pub mod wav;

pub use envelope::Envelope;
pub use pcm::{
    bytes_to_pcm16, decode_base64, encode_base64_chunked, pcm16_to_bytes, ProtocolError,
};
pub use wav::wrap_wav;

/// Sample rate of audio sent upstream (capture side)
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Sample rate of synthesized audio received from upstream
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;
