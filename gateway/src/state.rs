//! Shared application state

use std::sync::Arc;

use crate::config::ServerConfig;

/// State shared across all request handlers.
pub struct AppState {
    /// Server configuration, fixed for the process lifetime
    pub config: ServerConfig,
}

impl AppState {
    /// Create application state wrapped for sharing with axum routers.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        Arc::new(Self { config })
    }
}
