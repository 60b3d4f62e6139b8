//! Gateway configuration
//!
//! Configuration is loaded once at startup from environment variables
//! (a `.env` file is loaded in main.rs before this runs) and stays fixed
//! for the lifetime of the process. Every relay session created by this
//! gateway shares the same upstream model and system instruction.

use thiserror::Error;

/// Default listen host
const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port
const DEFAULT_PORT: u16 = 3001;

/// Default Gemini Live model
const DEFAULT_MODEL: &str = "gemini-live-2.5-flash-preview";

/// Default system instruction for the voice assistant persona
const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are Rev, the voice assistant for Revolt Motors. \
     Only discuss topics related to Revolt Motors, their electric motorcycles, \
     products, services, charging, pricing, and ownership. If asked about \
     anything unrelated, politely steer the conversation back to Revolt Motors.";

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Server configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to (HOST)
    pub host: String,

    /// Port to listen on (PORT)
    pub port: u16,

    /// Gemini API key (GEMINI_API_KEY, required)
    pub gemini_api_key: String,

    /// Gemini Live model name (GEMINI_MODEL)
    pub gemini_model: String,

    /// System instruction applied to every session (SYSTEM_INSTRUCTION)
    pub system_instruction: String,

    /// Disable upstream automatic activity detection so that turn
    /// interruption becomes available (GEMINI_MANUAL_ACTIVITY)
    pub manual_activity: bool,

    /// Comma-separated CORS origins, or "*" (CORS_ALLOWED_ORIGINS)
    pub cors_allowed_origins: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        let port = match std::env::var("PORT") {
            Ok(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidEnv {
                key: "PORT",
                value,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ConfigError::MissingEnv("GEMINI_API_KEY"))?;

        let gemini_model =
            std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let system_instruction = std::env::var("SYSTEM_INSTRUCTION")
            .unwrap_or_else(|_| DEFAULT_SYSTEM_INSTRUCTION.to_string());

        let manual_activity = match std::env::var("GEMINI_MANUAL_ACTIVITY") {
            Ok(value) => match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "GEMINI_MANUAL_ACTIVITY",
                        value,
                    });
                }
            },
            Err(_) => false,
        };

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS").ok();

        Ok(Self {
            host,
            port,
            gemini_api_key,
            gemini_model,
            system_instruction,
            manual_activity,
            cors_allowed_origins,
        })
    }

    /// Get the server address as a "host:port" string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
