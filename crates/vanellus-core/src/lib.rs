//! # Vanellus Core
//!
//! Key material, envelopes and wire records shared by every Vanellus role.
//!
//! ## Overview
//!
//! The relay that connects users, providers and mediators never sees
//! plaintext. Everything it stores is either signed (so recipients can check
//! who produced it) or ECDH-encrypted (so only the intended recipient can
//! read it), and often both.
//!
//! ## Key Concepts
//!
//! - **SignedData**: a payload string plus an ECDSA P-256 signature
//! - **EcdhEnvelope**: ChaCha20-Poly1305 ciphertext under an ECDH-derived key
//! - **SealedData**: symmetric ciphertext for backups and local state
//! - **Secret**: a short base32 bearer secret that backup keys derive from
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vanellus_core::{ecdh_decrypt, ecdh_encrypt, sign, verify, KeyPair};
//!
//! let provider = KeyPair::generate_ecdsa();
//! let signed = sign("hello", &provider.private_key, &provider.public_key).unwrap();
//! assert!(verify(&[provider.public_key.clone()], &signed));
//!
//! let sender = KeyPair::generate_ecdh();
//! let recipient = KeyPair::generate_ecdh();
//! let envelope = ecdh_encrypt("hello", &sender, &recipient.public_key).unwrap();
//! assert_eq!(ecdh_decrypt(&envelope, &recipient.private_key).unwrap(), "hello");
//! ```

pub mod backend;
pub mod backup;
pub mod codec;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod models;

pub use backend::{CryptoBackend, SoftwareCrypto};
pub use backup::{open_backup, seal_backup, Secret, DEFAULT_SECRET_LENGTH};
pub use crypto::{
    EncryptionNonce, EphemeralKeyPair, KeyPair, PrivateKey, PublicKey, SharedKey, SymmetricKey,
};
pub use envelope::{
    ecdh_decrypt, ecdh_encrypt, ecdh_encrypt_ephemeral, sign, verify, EcdhEnvelope, SealedData,
    SignedData,
};
pub use error::{CryptoError, Result};
pub use keys::{AdminKeyPairs, MediatorKeyPairs, ProviderKeyPairs, ProviderPublicKeys};
pub use models::*;
