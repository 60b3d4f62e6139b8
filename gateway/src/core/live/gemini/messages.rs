//! Gemini Live wire messages.
//!
//! The BidiGenerateContent protocol keys messages by their top-level
//! field rather than a tag: the first client frame is `setup`, audio goes
//! up as `realtimeInput`, and server frames carry `setupComplete`,
//! `serverContent` or `error`. All field names are camelCase per the API.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::INPUT_AUDIO_MIME;

// =============================================================================
// Client Messages
// =============================================================================

/// Messages sent to Gemini Live. Untagged: each variant serializes to its
/// distinguishing top-level field.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// Session setup, must be the first frame
    Setup {
        setup: Setup,
    },
    /// Streaming input (audio chunks or activity markers)
    RealtimeInput {
        #[serde(rename = "realtimeInput")]
        realtime_input: RealtimeInput,
    },
}

impl ClientMessage {
    /// Build a realtime audio chunk message from raw PCM bytes.
    pub fn audio_chunk(pcm: &[u8]) -> Self {
        ClientMessage::RealtimeInput {
            realtime_input: RealtimeInput {
                media_chunks: Some(vec![MediaChunk {
                    mime_type: INPUT_AUDIO_MIME.to_string(),
                    data: BASE64_STANDARD.encode(pcm),
                }]),
                activity_end: None,
            },
        }
    }

    /// Build an end-of-activity marker. Only legal when automatic
    /// activity detection is disabled in the session setup.
    pub fn activity_end() -> Self {
        ClientMessage::RealtimeInput {
            realtime_input: RealtimeInput {
                media_chunks: None,
                activity_end: Some(ActivityMarker {}),
            },
        }
    }
}

/// Session setup payload.
#[derive(Debug, Serialize)]
pub struct Setup {
    pub model: String,

    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,

    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<SystemInstruction>,

    #[serde(
        rename = "realtimeInputConfig",
        skip_serializing_if = "Option::is_none"
    )]
    pub realtime_input_config: Option<RealtimeInputConfig>,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct RealtimeInputConfig {
    #[serde(rename = "automaticActivityDetection")]
    pub automatic_activity_detection: ActivityDetection,
}

#[derive(Debug, Serialize)]
pub struct ActivityDetection {
    pub disabled: bool,
}

/// Streaming input frame.
#[derive(Debug, Serialize)]
pub struct RealtimeInput {
    #[serde(rename = "mediaChunks", skip_serializing_if = "Option::is_none")]
    pub media_chunks: Option<Vec<MediaChunk>>,

    #[serde(rename = "activityEnd", skip_serializing_if = "Option::is_none")]
    pub activity_end: Option<ActivityMarker>,
}

/// Base64 audio chunk with its MIME type.
#[derive(Debug, Serialize)]
pub struct MediaChunk {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

/// Empty activity boundary marker, serializes to `{}`.
#[derive(Debug, Serialize)]
pub struct ActivityMarker {}

// =============================================================================
// Server Messages
// =============================================================================

/// A frame received from Gemini Live. Fields are optional because each
/// frame carries only one of them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub error: Option<ServerError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,

    #[serde(default)]
    pub turn_complete: bool,

    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct ServerError {
    pub message: Option<String>,
    pub code: Option<i64>,
}
