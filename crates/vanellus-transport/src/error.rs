//! Error types for the transport module.

use thiserror::Error;

/// Errors that can occur while talking to the relay.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The relay could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The relay rejected the call.
    #[error("{method} failed: {message}")]
    Server { method: String, message: String },

    /// The call needs a signing key the relay accepts.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The relay does not know the method.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// The relay answered with something the client cannot parse.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn server(method: &str, message: impl Into<String>) -> Self {
        Self::Server {
            method: method.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
