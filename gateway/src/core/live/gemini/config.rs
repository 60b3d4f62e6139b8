//! Gemini Live API constants.

/// Gemini Live WebSocket endpoint (BidiGenerateContent).
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// MIME type for audio sent upstream (16 kHz PCM mono).
pub const INPUT_AUDIO_MIME: &str = "audio/pcm;rate=16000";

/// How long to wait for setupComplete before giving up.
pub const SETUP_TIMEOUT_SECS: u64 = 15;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_mime_matches_wire_sample_rate() {
        assert_eq!(
            INPUT_AUDIO_MIME,
            format!("audio/pcm;rate={}", voxrelay_protocol::INPUT_SAMPLE_RATE)
        );
    }
}
