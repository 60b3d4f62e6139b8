//! WAV container wrapping
//!
//! Upstream synthesized audio arrives as raw 24 kHz PCM16. The client
//! plays it through a generic media decoder, which needs a self-describing
//! container, so the gateway wraps each chunk in a minimal RIFF/WAV header
//! before base64-encoding it into an `audio` envelope.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;

/// Container wrap failures
#[derive(Debug, Error)]
pub enum WavError {
    #[error("WAV write failed: {0}")]
    Write(#[from] hound::Error),
}

/// Wraps mono PCM16 samples in a WAV container at the given sample rate.
pub fn wrap_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, WavError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        let mut i16_writer = writer.get_i16_writer(samples.len() as u32);
        for &s in samples {
            i16_writer.write_sample(s);
        }
        i16_writer.flush()?;
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
