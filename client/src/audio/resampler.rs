//! Downsampling of captured float audio to 16 kHz PCM16.
//!
//! Runs inside the capture callback once per hardware block, so it must
//! stay allocation-light: the only allocation is the output buffer.

/// Target sample rate for audio sent to the gateway.
pub const TARGET_SAMPLE_RATE: u32 = voxrelay_protocol::INPUT_SAMPLE_RATE;

/// Clamp a float sample to [-1, 1] and scale to a signed 16-bit value.
///
/// Negative values scale by 32768 and non-negative by 32767 so that both
/// ends of the float range map onto the exact i16 boundaries.
fn clamp_scale(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Convert a block of float samples at `src_rate` into 16 kHz PCM16.
///
/// At 16 kHz input this is a direct per-sample conversion. Any other rate
/// goes through block-averaging decimation: output sample `i` is the
/// average of the source window `[round(i*ratio), round((i+1)*ratio))`
/// where `ratio = src_rate / 16000`. An empty window contributes silence.
pub fn resample_to_pcm16(input: &[f32], src_rate: u32) -> Vec<i16> {
    if src_rate == TARGET_SAMPLE_RATE {
        return input.iter().copied().map(clamp_scale).collect();
    }

    let ratio = src_rate as f64 / TARGET_SAMPLE_RATE as f64;
    let out_len = (input.len() as f64 / ratio).round() as usize;
    let mut output = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let start = (i as f64 * ratio).round() as usize;
        let end = (((i + 1) as f64) * ratio).round() as usize;
        let end = end.min(input.len());

        let avg = if start >= end {
            0.0
        } else {
            let window = &input[start..end];
            window.iter().sum::<f32>() / window.len() as f32
        };
        output.push(clamp_scale(avg));
    }

    output
}

/// Downmix an interleaved multi-channel block to mono by averaging frames.
pub fn downmix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_at_target_rate() {
        let input = vec![0.0, 0.5, -0.5, 1.0, -1.0];
        let output = resample_to_pcm16(&input, TARGET_SAMPLE_RATE);

        assert_eq!(output.len(), input.len());
        assert_eq!(output[0], 0);
        assert_eq!(output[1], 16383); // 0.5 * 32767 truncated
        assert_eq!(output[2], -16384); // -0.5 * 32768
        assert_eq!(output[3], 32767);
        assert_eq!(output[4], -32768);
    }

    #[test]
    fn test_clamp_out_of_range() {
        let input = vec![2.5, -3.0, 1.0001, -1.0001];
        let output = resample_to_pcm16(&input, TARGET_SAMPLE_RATE);

        assert_eq!(output, vec![32767, -32768, 32767, -32768]);
    }

    #[test]
    fn test_halved_length_at_double_rate() {
        for n in [0usize, 1, 2, 3, 100, 4096, 4097] {
            let input = vec![0.25; n];
            let output = resample_to_pcm16(&input, 32_000);

            let expected = (n as f64 / 2.0).round() as usize;
            let diff = output.len().abs_diff(expected);
            assert!(diff <= 1, "length {} for input {}", output.len(), n);
        }
    }

    #[test]
    fn test_decimation_averages_windows() {
        // ratio = 3: each output sample averages three inputs
        let input = vec![0.0, 0.3, 0.6, 0.9, 0.9, 0.9];
        let output = resample_to_pcm16(&input, 48_000);

        assert_eq!(output.len(), 2);
        assert_eq!(output[0], (0.3f32 * 32767.0) as i16);
        assert_eq!(output[1], (0.9f32 * 32767.0) as i16);
    }

    #[test]
    fn test_empty_window_is_silence() {
        // ratio = 0.5 produces more outputs than inputs; the windows that
        // cover no source sample must yield 0, never divide by zero
        let input = vec![0.5, 0.5];
        let output = resample_to_pcm16(&input, 8_000);

        assert_eq!(output.len(), 4);
        assert!(output.contains(&0));
        for sample in output {
            assert!(sample == 0 || sample == (0.5f32 * 32767.0) as i16);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_to_pcm16(&[], TARGET_SAMPLE_RATE).is_empty());
        assert!(resample_to_pcm16(&[], 44_100).is_empty());
    }

    #[test]
    fn test_downmix_stereo() {
        let data = vec![0.2, 0.4, -0.5, -0.5];
        let mono = downmix_to_mono(&data, 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert!((mono[1] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let data = vec![0.1, 0.2];
        assert_eq!(downmix_to_mono(&data, 1), data);
    }
}
