//! Pluggable crypto back end.
//!
//! Protocol code only talks to [`CryptoBackend`]; [`SoftwareCrypto`] is the
//! pure-Rust P-256 implementation.

use crate::crypto::{KeyPair, PrivateKey, PublicKey};
use crate::envelope::{self, EcdhEnvelope, SignedData};
use crate::error::Result;

/// The envelope operations the role clients depend on.
///
/// Implementations are stateless and must be usable from any thread.
pub trait CryptoBackend: Send + Sync {
    /// Sign `payload` with ECDSA.
    fn sign(&self, payload: &str, key_pair: &KeyPair) -> Result<SignedData>;

    /// Returns true iff at least one candidate validates the envelope.
    fn verify(&self, candidates: &[PublicKey], envelope: &SignedData) -> bool;

    /// Encrypt from a static sender key pair.
    fn ecdh_encrypt(
        &self,
        payload: &str,
        sender: &KeyPair,
        recipient: &PublicKey,
    ) -> Result<EcdhEnvelope>;

    /// Encrypt with a fresh one-time sender key.
    fn ecdh_encrypt_ephemeral(&self, payload: &str, recipient: &PublicKey) -> Result<EcdhEnvelope>;

    /// Decrypt with the recipient's private key.
    fn ecdh_decrypt(&self, envelope: &EcdhEnvelope, recipient: &PrivateKey) -> Result<String>;
}

/// Software P-256 / ChaCha20-Poly1305 back end.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftwareCrypto;

impl CryptoBackend for SoftwareCrypto {
    fn sign(&self, payload: &str, key_pair: &KeyPair) -> Result<SignedData> {
        envelope::sign(payload, &key_pair.private_key, &key_pair.public_key)
    }

    fn verify(&self, candidates: &[PublicKey], envelope: &SignedData) -> bool {
        envelope::verify(candidates, envelope)
    }

    fn ecdh_encrypt(
        &self,
        payload: &str,
        sender: &KeyPair,
        recipient: &PublicKey,
    ) -> Result<EcdhEnvelope> {
        envelope::ecdh_encrypt(payload, sender, recipient)
    }

    fn ecdh_encrypt_ephemeral(&self, payload: &str, recipient: &PublicKey) -> Result<EcdhEnvelope> {
        envelope::ecdh_encrypt_ephemeral(payload, recipient)
    }

    fn ecdh_decrypt(&self, envelope: &EcdhEnvelope, recipient: &PrivateKey) -> Result<String> {
        envelope::ecdh_decrypt(envelope, recipient)
    }
}
