//! Secret-derived backups.
//!
//! A [`Secret`] is a short random value the user writes down. From it we
//! derive a symmetric key and a storage id; the relay only ever sees the id
//! and the sealed bytes.

use serde::{de::DeserializeOwned, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::codec;
use crate::crypto::{random_bytes, SymmetricKey};
use crate::envelope::SealedData;
use crate::error::{CryptoError, Result};

/// Default number of random bytes in a secret.
pub const DEFAULT_SECRET_LENGTH: usize = 15;

const BACKUP_KEY_CONTEXT: &str = "vanellus 2021-11 backup encryption key";
const BACKUP_ID_CONTEXT: &str = "vanellus 2021-11 backup storage id";
const BACKUP_AAD: &[u8] = b"vanellus-backup";

/// A bearer secret, Crockford base32 encoded.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Generate a secret of `len` random bytes.
    pub fn generate(len: usize) -> Self {
        Self(codec::to_base32(&random_bytes(len)))
    }

    /// Parse a secret typed in by a user.
    ///
    /// Normalizes case and the Crockford lookalikes, drops hyphens.
    pub fn parse(input: &str) -> Result<Self> {
        let bytes = codec::from_base32(input.trim())?;
        if bytes.is_empty() {
            return Err(CryptoError::Encoding("empty secret".into()));
        }
        Ok(Self(codec::to_base32(&bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn material(&self) -> Result<Vec<u8>> {
        codec::from_base32(&self.0)
    }

    /// The symmetric key backups are sealed with.
    pub fn backup_key(&self) -> Result<SymmetricKey> {
        let mut material = self.material()?;
        let key = blake3::derive_key(BACKUP_KEY_CONTEXT, &material);
        material.zeroize();
        Ok(SymmetricKey::from_bytes(key))
    }

    /// Where the backup is stored. Reveals nothing about the key.
    pub fn storage_id(&self) -> Result<String> {
        let mut material = self.material()?;
        let id = blake3::derive_key(BACKUP_ID_CONTEXT, &material);
        material.zeroize();
        Ok(hex::encode(id))
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// Seal `state` under a key derived from `secret`.
pub fn seal_backup<T: Serialize>(state: &T, secret: &Secret) -> Result<SealedData> {
    let mut plaintext = Vec::new();
    ciborium::into_writer(state, &mut plaintext).map_err(|e| CryptoError::Encoding(e.to_string()))?;
    let sealed = SealedData::seal(&plaintext, &secret.backup_key()?, BACKUP_AAD);
    plaintext.zeroize();
    sealed
}

/// Open a backup sealed by [`seal_backup`].
///
/// A wrong secret fails authentication; it never yields a different state.
pub fn open_backup<T: DeserializeOwned>(sealed: &SealedData, secret: &Secret) -> Result<T> {
    let mut plaintext = sealed.open(&secret.backup_key()?, BACKUP_AAD)?;
    let state = ciborium::from_reader(plaintext.as_slice())
        .map_err(|e| CryptoError::Decryption(format!("malformed backup: {}", e)));
    plaintext.zeroize();
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct State {
        name: String,
        items: Vec<u32>,
    }

    #[test]
    fn test_secret_shape() {
        let secret = Secret::generate(DEFAULT_SECRET_LENGTH);
        assert_eq!(secret.as_str().len(), 24);
        assert_ne!(secret, Secret::generate(DEFAULT_SECRET_LENGTH));
    }

    #[test]
    fn test_parse_normalizes() {
        let secret = Secret::generate(DEFAULT_SECRET_LENGTH);
        let typed = format!(
            "{}-{}",
            &secret.as_str()[..12].to_lowercase(),
            &secret.as_str()[12..]
        );
        assert_eq!(Secret::parse(&typed).unwrap(), secret);
        assert!(Secret::parse("").is_err());
    }

    #[test]
    fn test_derivations_are_stable_and_distinct() {
        let secret = Secret::generate(DEFAULT_SECRET_LENGTH);
        assert_eq!(secret.storage_id().unwrap(), secret.storage_id().unwrap());
        assert_eq!(
            secret.backup_key().unwrap().as_bytes(),
            secret.backup_key().unwrap().as_bytes()
        );
        assert_ne!(
            hex::encode(secret.backup_key().unwrap().as_bytes()),
            secret.storage_id().unwrap()
        );
    }

    #[test]
    fn test_backup_roundtrip() {
        let secret = Secret::generate(DEFAULT_SECRET_LENGTH);
        let state = State {
            name: "provider".into(),
            items: vec![1, 2, 3],
        };

        let sealed = seal_backup(&state, &secret).unwrap();
        let restored: State = open_backup(&sealed, &secret).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_backup_wrong_secret() {
        let sealed = seal_backup(
            &State {
                name: "x".into(),
                items: vec![],
            },
            &Secret::generate(DEFAULT_SECRET_LENGTH),
        )
        .unwrap();

        let other = Secret::generate(DEFAULT_SECRET_LENGTH);
        assert!(matches!(
            open_backup::<State>(&sealed, &other),
            Err(CryptoError::Decryption(_))
        ));
    }
}
