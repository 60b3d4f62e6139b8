//! Route configuration
//!
//! - `api` - Public HTTP routes (health banner)
//! - `relay` - Voice relay WebSocket route

pub mod api;
pub mod relay;

pub use api::create_api_router;
pub use relay::create_relay_router;
