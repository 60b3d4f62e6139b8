//! Gemini Live provider.

pub mod client;
pub mod config;
pub mod messages;

pub use client::GeminiLive;
pub use config::{GEMINI_LIVE_URL, INPUT_AUDIO_MIME};
