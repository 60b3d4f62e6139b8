//! Plain HTTP handlers.

use axum::response::IntoResponse;

/// Health check endpoint
///
/// Returns a plain-text banner so deployments and load balancers can
/// verify the gateway is up without opening a WebSocket.
pub async fn health_check() -> impl IntoResponse {
    "voxrelay gateway is running"
}
