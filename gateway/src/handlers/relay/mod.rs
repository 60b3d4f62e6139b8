//! Relay WebSocket handlers.

pub mod handler;
pub mod messages;

pub use handler::relay_handler;
