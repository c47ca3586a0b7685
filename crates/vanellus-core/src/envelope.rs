//! Signed and encrypted envelopes.
//!
//! [`SignedData`] carries authenticity: a serialized payload plus an ECDSA
//! signature that must validate under one of a set of known-good keys.
//! [`EcdhEnvelope`] carries confidentiality: ciphertext only the holder of
//! the recipient private key can open. [`SealedData`] is the symmetric
//! variant used for backups and the local cache.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::codec;
use crate::crypto::{
    EncryptionNonce, EphemeralKeyPair, KeyPair, PrivateKey, PublicKey, SymmetricKey,
};
use crate::error::{CryptoError, Result};

/// A payload together with a signature over its UTF-8 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedData {
    /// The canonical serialized payload.
    pub data: String,

    /// 64-byte ECDSA P-256 signature (`r || s`).
    #[serde(with = "codec::base64_bytes")]
    pub signature: Vec<u8>,

    /// The signer's public key, as a hint. Never trusted on its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
}

impl SignedData {
    /// Sign a value serialized as JSON.
    pub fn sign_json<T: Serialize>(value: &T, key_pair: &KeyPair) -> Result<Self> {
        let data = serde_json::to_string(value).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        sign(&data, &key_pair.private_key, &key_pair.public_key)
    }

    /// Check the signature against a set of candidate keys.
    pub fn verify(&self, candidates: &[PublicKey]) -> bool {
        verify(candidates, self)
    }

    /// Verify, then parse the payload as JSON.
    ///
    /// A payload that verifies but does not parse is still rejected.
    pub fn open<T: DeserializeOwned>(&self, candidates: &[PublicKey]) -> Result<T> {
        if !self.verify(candidates) {
            return Err(CryptoError::Verification(
                "no candidate key validates the signature".into(),
            ));
        }
        serde_json::from_str(&self.data)
            .map_err(|e| CryptoError::Verification(format!("malformed signed payload: {}", e)))
    }
}

/// Sign `payload` with ECDSA P-256 / SHA-256.
pub fn sign(payload: &str, private_key: &PrivateKey, public_key: &PublicKey) -> Result<SignedData> {
    let signature = private_key.sign(payload.as_bytes())?;
    Ok(SignedData {
        data: payload.to_string(),
        signature,
        public_key: Some(public_key.clone()),
    })
}

/// Returns true iff at least one candidate key validates the envelope.
///
/// Keys that fail to import count as non-matches.
pub fn verify(candidates: &[PublicKey], envelope: &SignedData) -> bool {
    candidates
        .iter()
        .any(|key| key.verify(envelope.data.as_bytes(), &envelope.signature).is_ok())
}

/// An ECDH-encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcdhEnvelope {
    /// AEAD nonce, fresh per encryption.
    #[serde(with = "codec::base64_bytes")]
    pub iv: Vec<u8>,

    /// The sender's ECDH public key (static or one-time).
    pub ephemeral_public_key: PublicKey,

    /// Detached authentication tag.
    #[serde(with = "codec::base64_bytes")]
    pub mac: Vec<u8>,

    /// Ciphertext.
    #[serde(with = "codec::base64_bytes")]
    pub data: Vec<u8>,
}

/// Encrypt `payload` from a static sender key pair to a recipient.
pub fn ecdh_encrypt(
    payload: &str,
    sender: &KeyPair,
    recipient: &PublicKey,
) -> Result<EcdhEnvelope> {
    let shared = sender.private_key.diffie_hellman(recipient)?;
    seal_to(payload, &shared.derive_encryption_key()?, sender.public_key.clone())
}

/// Encrypt `payload` with a fresh one-time sender key.
pub fn ecdh_encrypt_ephemeral(payload: &str, recipient: &PublicKey) -> Result<EcdhEnvelope> {
    let ephemeral = EphemeralKeyPair::generate();
    let sender_public = ephemeral.public_key().clone();
    let shared = ephemeral.diffie_hellman(recipient)?;
    seal_to(payload, &shared.derive_encryption_key()?, sender_public)
}

fn seal_to(payload: &str, key: &SymmetricKey, sender_public: PublicKey) -> Result<EcdhEnvelope> {
    let nonce = EncryptionNonce::generate();
    let (data, mac) = key.encrypt_detached(payload.as_bytes(), &nonce, sender_public.as_bytes())?;
    Ok(EcdhEnvelope {
        iv: nonce.as_bytes().to_vec(),
        ephemeral_public_key: sender_public,
        mac: mac.to_vec(),
        data,
    })
}

/// Decrypt an envelope with the recipient's private key.
///
/// Every failure, including malformed key material, is reported as
/// [`CryptoError::Decryption`].
pub fn ecdh_decrypt(envelope: &EcdhEnvelope, recipient: &PrivateKey) -> Result<String> {
    open_from(envelope, recipient).map_err(CryptoError::into_decryption)
}

fn open_from(envelope: &EcdhEnvelope, recipient: &PrivateKey) -> Result<String> {
    let nonce = EncryptionNonce::from_slice(&envelope.iv)?;
    let shared = recipient.diffie_hellman(&envelope.ephemeral_public_key)?;
    let key = shared.derive_encryption_key()?;
    let plaintext = key.decrypt_detached(
        &envelope.data,
        &nonce,
        envelope.ephemeral_public_key.as_bytes(),
        &envelope.mac,
    )?;
    codec::utf8_string(plaintext)
}

impl EcdhEnvelope {
    /// Encrypt a value serialized as JSON from a static sender.
    pub fn encrypt_json<T: Serialize>(
        value: &T,
        sender: &KeyPair,
        recipient: &PublicKey,
    ) -> Result<Self> {
        let payload =
            serde_json::to_string(value).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        ecdh_encrypt(&payload, sender, recipient)
    }

    /// Decrypt and parse the plaintext as JSON.
    pub fn decrypt_json<T: DeserializeOwned>(&self, recipient: &PrivateKey) -> Result<T> {
        let plaintext = ecdh_decrypt(self, recipient)?;
        serde_json::from_str(&plaintext)
            .map_err(|e| CryptoError::Decryption(format!("malformed plaintext: {}", e)))
    }
}

/// Symmetrically sealed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedData {
    #[serde(with = "codec::base64_bytes")]
    pub iv: Vec<u8>,

    #[serde(with = "codec::base64_bytes")]
    pub mac: Vec<u8>,

    #[serde(with = "codec::base64_bytes")]
    pub data: Vec<u8>,
}

impl SealedData {
    /// Seal `plaintext`; `context` is bound into the tag and must match on open.
    pub fn seal(plaintext: &[u8], key: &SymmetricKey, context: &[u8]) -> Result<Self> {
        let nonce = EncryptionNonce::generate();
        let (data, mac) = key.encrypt_detached(plaintext, &nonce, context)?;
        Ok(Self {
            iv: nonce.as_bytes().to_vec(),
            mac: mac.to_vec(),
            data,
        })
    }

    /// Open with the given key and context.
    pub fn open(&self, key: &SymmetricKey, context: &[u8]) -> Result<Vec<u8>> {
        let nonce = EncryptionNonce::from_slice(&self.iv)?;
        key.decrypt_detached(&self.data, &nonce, context, &self.mac)
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}
