//! Client error types.

use thiserror::Error;

/// Errors that can occur in the voice client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Gateway connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket transport error
    #[error("Transport error: {0}")]
    TransportError(String),

    /// Audio device error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Invalid envelope received from the gateway
    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::ConnectionFailed("refused".to_string());
        assert!(err.to_string().contains("Connection failed"));

        let err = ClientError::AudioDeviceError("no input device".to_string());
        assert!(err.to_string().contains("no input device"));
    }
}
