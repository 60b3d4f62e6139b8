//! Relay channel envelope types
//!
//! Every message on the client/gateway WebSocket channel is one JSON
//! envelope, tagged by a `type` field. The same enum serves both
//! directions: `audio` carries capture frames upstream and synthesized WAV
//! downstream, `stop` and `ping` flow client-to-gateway, while `pong`,
//! `transcript`, `turnComplete` and `error` flow back.

use serde::{Deserialize, Serialize};

/// A single message on the relay channel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// Base64 PCM16 frame (client -> gateway) or base64 WAV (gateway -> client)
    #[serde(rename = "audio")]
    Audio {
        /// Base64 payload
        data: String,
    },

    /// Interrupt the current model turn (barge-in)
    #[serde(rename = "stop")]
    Stop,

    /// Application-level keepalive
    #[serde(rename = "ping")]
    Ping,

    /// Keepalive reply
    #[serde(rename = "pong")]
    Pong,

    /// Model turn text, newline-joined over the turn's textual parts
    #[serde(rename = "transcript")]
    Transcript {
        /// Transcript text
        text: String,
    },

    /// The model finished its current turn
    #[serde(rename = "turnComplete")]
    TurnComplete,

    /// Upstream or gateway failure surfaced to the client
    #[serde(rename = "error")]
    Error {
        /// Human-readable error description
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_round_trip() {
        let env = Envelope::Audio {
            data: "AAAA".to_string(),
        };
        let json = serde_json::to_string(&env).expect("Should serialize");
        assert!(json.contains(r#""type":"audio""#));
        assert!(json.contains(r#""data":"AAAA""#));
        let back: Envelope = serde_json::from_str(&json).expect("Should deserialize");
        assert_eq!(back, env);
    }

    #[test]
    fn test_unit_variant_tags() {
        for (env, tag) in [
            (Envelope::Stop, "stop"),
            (Envelope::Ping, "ping"),
            (Envelope::Pong, "pong"),
            (Envelope::TurnComplete, "turnComplete"),
        ] {
            let json = serde_json::to_string(&env).expect("Should serialize");
            assert_eq!(json, format!(r#"{{"type":"{}"}}"#, tag));
            let back: Envelope = serde_json::from_str(&json).expect("Should deserialize");
            assert_eq!(back, env);
        }
    }

    #[test]
    fn test_transcript_deserialization() {
        let json = r#"{"type":"transcript","text":"hello\nworld"}"#;
        let env: Envelope = serde_json::from_str(json).expect("Should deserialize");
        match env {
            Envelope::Transcript { text } => assert_eq!(text, "hello\nworld"),
            _ => panic!("Expected Transcript variant"),
        }
    }

    #[test]
    fn test_error_serialization() {
        let env = Envelope::Error {
            error: "upstream connection failed".to_string(),
        };
        let json = serde_json::to_string(&env).expect("Should serialize");
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""error":"upstream connection failed""#));
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let json = r#"{"type":"videoFrame","data":"AAAA"}"#;
        assert!(serde_json::from_str::<Envelope>(json).is_err());
    }
}
