//! Base trait and types for upstream conversational speech sessions.
//!
//! A live session is a bidirectional audio stream against an upstream
//! speech API: 16 kHz PCM16 goes up, 24 kHz PCM16 plus transcripts and
//! turn events come back through registered callbacks.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during live session operations.
#[derive(Debug, Error)]
pub enum LiveError {
    /// Connection to the upstream API failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Error reported by the upstream API
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for live session operations.
pub type LiveResult<T> = Result<T, LiveError>;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a live session.
#[derive(Debug, Clone, Default)]
pub struct LiveConfig {
    /// API key for authentication
    pub api_key: String,

    /// Model to use
    pub model: String,

    /// System instruction applied at session setup
    pub system_instruction: Option<String>,

    /// Disable upstream automatic activity detection. When set, the
    /// session accepts explicit end-of-turn signals and reports turn
    /// interruption as supported.
    pub manual_activity: bool,
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback for synthesized audio chunks (PCM 16-bit, 24kHz, mono, LE).
pub type AudioCallback =
    Arc<dyn Fn(Bytes) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback for model turn text, newline-joined over the event's parts.
pub type TranscriptCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback fired when the model completes its turn.
pub type TurnCompleteCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback for upstream errors.
pub type LiveErrorCallback =
    Arc<dyn Fn(LiveError) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback fired when the upstream connection closes.
pub type CloseCallback = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Base Trait
// =============================================================================

/// Base trait for upstream live speech sessions.
///
/// Callbacks must be registered before `connect()` so that no early
/// upstream event is lost. `send_audio_chunk` enqueues onto the session's
/// internal writer and returns without waiting for network I/O; chunks are
/// delivered upstream in call order.
#[async_trait]
pub trait BaseLive: Send + Sync {
    /// Create a new session instance.
    fn new(config: LiveConfig) -> LiveResult<Self>
    where
        Self: Sized;

    /// Connect to the upstream API and complete session setup.
    async fn connect(&mut self) -> LiveResult<()>;

    /// Close the session. Idempotent; closing a closed session is a no-op.
    async fn close(&mut self) -> LiveResult<()>;

    /// Check if the session is connected and ready.
    fn is_ready(&self) -> bool;

    /// Whether this session can interrupt an in-flight model turn.
    /// Resolved once at construction from configuration.
    fn supports_turn_interrupt(&self) -> bool;

    /// Send a 16 kHz PCM16 audio chunk upstream.
    async fn send_audio_chunk(&mut self, pcm: Bytes) -> LiveResult<()>;

    /// Signal end of the user's turn, interrupting model output.
    /// Only meaningful when `supports_turn_interrupt()` is true.
    async fn end_turn(&mut self) -> LiveResult<()>;

    /// Register a callback for synthesized audio.
    fn on_audio(&mut self, callback: AudioCallback) -> LiveResult<()>;

    /// Register a callback for turn transcripts.
    fn on_transcript(&mut self, callback: TranscriptCallback) -> LiveResult<()>;

    /// Register a callback for turn completion.
    fn on_turn_complete(&mut self, callback: TurnCompleteCallback) -> LiveResult<()>;

    /// Register a callback for upstream errors.
    fn on_error(&mut self, callback: LiveErrorCallback) -> LiveResult<()>;

    /// Register a callback for upstream connection close.
    fn on_close(&mut self, callback: CloseCallback) -> LiveResult<()>;
}

/// Boxed trait object for live sessions.
pub type BoxedLive = Box<dyn BaseLive>;
