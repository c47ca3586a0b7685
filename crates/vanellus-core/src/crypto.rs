//! Cryptographic primitives.
//!
//! P-256 ECDSA signing, P-256 ECDH key agreement with HKDF-SHA256 key
//! derivation, and ChaCha20-Poly1305 authenticated encryption with a
//! detached tag.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Nonce, Tag,
};
use hkdf::Hkdf;
use p256::ecdsa::{
    signature::{Signer, Verifier},
    Signature, SigningKey, VerifyingKey,
};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec;
use crate::error::{CryptoError, Result};

/// Length of an AEAD nonce (the envelope `iv`).
pub const IV_LEN: usize = 12;

/// Length of the detached authentication tag (the envelope `mac`).
pub const MAC_LEN: usize = 16;

/// HKDF info string for ECDH-derived encryption keys.
const ECDH_KDF_INFO: &[u8] = b"vanellus-ecdh-v1-chacha20poly1305";

/// Fill a fresh buffer with `len` random bytes.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// A P-256 public key (SEC1 uncompressed point, 65 bytes).
///
/// The same encoding serves ECDSA verification and ECDH agreement.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "codec::base64_bytes")] Vec<u8>);

impl PublicKey {
    /// Wrap raw bytes. The bytes are only parsed when the key is used.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Convert to base64.
    pub fn to_base64(&self) -> String {
        codec::to_base64(&self.0)
    }

    /// Parse from base64.
    pub fn from_base64(s: &str) -> Result<Self> {
        codec::from_base64(s).map(Self)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    fn to_p256(&self) -> Result<p256::PublicKey> {
        p256::PublicKey::from_sec1_bytes(&self.0)
            .map_err(|_| CryptoError::InvalidKey("not a P-256 public key".into()))
    }

    /// Verify an ECDSA P-256 / SHA-256 signature over a message.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let verifying_key = VerifyingKey::from_sec1_bytes(&self.0)
            .map_err(|_| CryptoError::InvalidKey("not a P-256 verifying key".into()))?;
        let signature = Signature::from_slice(signature)
            .map_err(|_| CryptoError::Verification("malformed signature".into()))?;
        verifying_key
            .verify(message, &signature)
            .map_err(|_| CryptoError::Verification("signature mismatch".into()))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "PublicKey({}...)", &hex[..hex.len().min(16)])
    }
}

impl From<p256::PublicKey> for PublicKey {
    fn from(pk: p256::PublicKey) -> Self {
        Self(pk.to_encoded_point(false).as_bytes().to_vec())
    }
}

/// A P-256 private scalar (32 bytes). Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(#[serde(with = "codec::base64_bytes")] Vec<u8>);

impl PrivateKey {
    /// Wrap raw scalar bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes (secret key material).
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn to_p256(&self) -> Result<p256::SecretKey> {
        p256::SecretKey::from_slice(&self.0)
            .map_err(|_| CryptoError::InvalidKey("not a P-256 private key".into()))
    }

    /// Sign a message with ECDSA P-256 / SHA-256.
    ///
    /// Returns the 64-byte `r || s` signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signing_key = SigningKey::from_slice(&self.0)
            .map_err(|_| CryptoError::InvalidKey("not a P-256 signing key".into()))?;
        let signature: Signature = signing_key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }

    /// Perform ECDH key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &PublicKey) -> Result<SharedKey> {
        let secret = self.to_p256()?;
        let public = peer_public.to_p256()?;
        let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
        Ok(SharedKey::from_raw(shared.raw_secret_bytes()))
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        Ok(PublicKey::from(self.to_p256()?.public_key()))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// An asymmetric P-256 key pair.
///
/// Whether a pair is used for ECDSA or ECDH is decided by the role that owns
/// it; the key material has the same shape in both cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let secret = p256::SecretKey::random(&mut rand::thread_rng());
        Self {
            public_key: PublicKey::from(secret.public_key()),
            private_key: PrivateKey(secret.to_bytes().to_vec()),
        }
    }

    /// Generate a key pair for ECDSA signing.
    pub fn generate_ecdsa() -> Self {
        Self::generate()
    }

    /// Generate a key pair for ECDH key agreement.
    pub fn generate_ecdh() -> Self {
        Self::generate()
    }

    /// Rebuild a key pair from its private half.
    pub fn from_private_key(private_key: PrivateKey) -> Result<Self> {
        let public_key = private_key.public_key()?;
        Ok(Self {
            public_key,
            private_key,
        })
    }

    /// Sign a message with the private half.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.private_key.sign(message)
    }
}

/// A shared secret derived from ECDH key agreement.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; 32]);

impl SharedKey {
    fn from_raw(raw: &[u8]) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(raw);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a symmetric encryption key from this shared secret (HKDF-SHA256).
    pub fn derive_encryption_key(&self) -> Result<SymmetricKey> {
        let hkdf = Hkdf::<Sha256>::new(None, &self.0);
        let mut okm = [0u8; 32];
        hkdf.expand(ECDH_KDF_INFO, &mut okm)
            .map_err(|e| CryptoError::Encryption(format!("key derivation failed: {}", e)))?;
        Ok(SymmetricKey(okm))
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: p256::ecdh::EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = p256::ecdh::EphemeralSecret::random(&mut rand::thread_rng());
        let public = PublicKey::from(secret.public_key());
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret (can only be used once).
    pub fn diffie_hellman(self, peer_public: &PublicKey) -> Result<SharedKey> {
        let public = peer_public.to_p256()?;
        let shared = self.secret.diffie_hellman(&public);
        Ok(SharedKey::from_raw(shared.raw_secret_bytes()))
    }
}

/// A 256-bit symmetric key for ChaCha20-Poly1305. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey(#[serde(with = "codec::base64_array")] [u8; 32]);

impl SymmetricKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encrypt `plaintext`, binding `aad` into the tag.
    ///
    /// Returns the ciphertext and the detached 16-byte tag.
    pub fn encrypt_detached(
        &self,
        plaintext: &[u8],
        nonce: &EncryptionNonce,
        aad: &[u8],
    ) -> Result<(Vec<u8>, [u8; MAC_LEN])> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce.0), aad, &mut buffer)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&tag);
        Ok((buffer, mac))
    }

    /// Decrypt and authenticate `ciphertext` against a detached tag.
    pub fn decrypt_detached(
        &self,
        ciphertext: &[u8],
        nonce: &EncryptionNonce,
        aad: &[u8],
        mac: &[u8],
    ) -> Result<Vec<u8>> {
        if mac.len() != MAC_LEN {
            return Err(CryptoError::Decryption(format!(
                "mac must be {} bytes, got {}",
                MAC_LEN,
                mac.len()
            )));
        }

        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;

        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&nonce.0),
                aad,
                &mut buffer,
                Tag::from_slice(mac),
            )
            .map_err(|_| CryptoError::Decryption("authentication tag mismatch".into()))?;
        Ok(buffer)
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptionNonce(pub [u8; IV_LEN]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut bytes = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Parse from a received `iv` field.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; IV_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::Decryption(format!("iv must be {} bytes, got {}", IV_LEN, bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}
