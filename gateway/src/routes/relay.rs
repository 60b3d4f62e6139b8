//! Relay WebSocket route configuration
//!
//! Configures the WebSocket endpoint that bridges browser clients to an
//! upstream Gemini Live session.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay::relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay WebSocket router
///
/// # Endpoint
///
/// `GET /relay` - WebSocket upgrade for the voice relay channel
///
/// # Protocol
///
/// After the upgrade, every frame is a JSON text envelope tagged by
/// `type`. Clients send:
/// - `audio` with base64 PCM 16-bit, 16kHz, mono
/// - `stop` to interrupt an in-flight model turn
/// - `ping` keepalives
///
/// Server responds with:
/// - `audio` with base64 WAV (PCM 16-bit, 24kHz, mono)
/// - `transcript` for model turn text
/// - `turnComplete` when the model finishes its turn
/// - `pong` keepalive replies
/// - `error` on upstream failures
///
/// # Example
///
/// ```json
/// // Client sends microphone audio
/// {"type": "audio", "data": "<base64 pcm>"}
///
/// // Server sends back synthesized speech
/// {"type": "audio", "data": "<base64 wav>"}
/// {"type": "turnComplete"}
/// ```
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/relay", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
