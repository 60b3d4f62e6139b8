//! HTTP and WebSocket request handlers
//!
//! This module organizes the gateway's handlers into logical groups:
//! - `api` - Health check endpoint
//! - `relay` - Voice relay WebSocket bridging clients to Gemini Live

pub mod api;
pub mod relay;

// Re-export commonly used handlers for convenient access
pub use relay::relay_handler;
