//! Error types for the client SDK.

use thiserror::Error;
use vanellus_core::CryptoError;
use vanellus_store::StoreError;
use vanellus_transport::TransportError;

/// Errors that can occur during client operations.
///
/// `Verification` and `Decryption` mean the data in hand is untrusted and
/// has been discarded. They are never retried.
#[derive(Debug, Error)]
pub enum VanellusError {
    /// The relay call failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A signature did not check out.
    #[error("verification failed: {0}")]
    Verification(String),

    /// Ciphertext did not authenticate.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The operation is not valid in the current state.
    #[error("invalid state: {0}")]
    State(String),

    /// Local storage failed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// One of our own values could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<CryptoError> for VanellusError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Verification(msg) => Self::Verification(msg),
            CryptoError::Decryption(msg) => Self::Decryption(msg),
            CryptoError::InvalidKey(msg) => Self::Verification(format!("invalid key: {}", msg)),
            CryptoError::Encryption(msg) | CryptoError::Encoding(msg) => Self::Serialization(msg),
        }
    }
}

impl From<serde_json::Error> for VanellusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, VanellusError>;
