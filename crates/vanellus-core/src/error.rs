//! Error types for the Vanellus core.

use thiserror::Error;

/// Errors produced by key handling, envelopes and codecs.
///
/// Every failure to authenticate data collapses into either
/// [`CryptoError::Verification`] or [`CryptoError::Decryption`]; callers
/// must discard the associated data in both cases.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// A signature did not validate against any candidate key.
    #[error("signature verification failed: {0}")]
    Verification(String),

    /// Ciphertext failed to authenticate or the envelope was malformed.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Encryption could not be performed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Key material could not be imported.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// A codec or serialization step failed.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl CryptoError {
    /// Re-tag any failure on the decryption path as a decryption error.
    pub(crate) fn into_decryption(self) -> Self {
        match self {
            CryptoError::Decryption(msg) => CryptoError::Decryption(msg),
            other => CryptoError::Decryption(other.to_string()),
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
