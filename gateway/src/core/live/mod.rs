//! Upstream live speech session module.
//!
//! Provides the `BaseLive` abstraction for bidirectional audio streaming
//! against a conversational speech API, and the Gemini Live
//! implementation. Each relay channel owns exactly one session.

mod base;
pub mod gemini;

pub use base::{
    AudioCallback, BaseLive, BoxedLive, CloseCallback, LiveConfig, LiveError, LiveErrorCallback,
    LiveResult, TranscriptCallback, TurnCompleteCallback,
};
pub use gemini::GeminiLive;
