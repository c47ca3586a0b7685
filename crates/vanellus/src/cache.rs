//! Sealed local cache.
//!
//! Entries are CBOR-encoded, then sealed with a symmetric key (for providers,
//! the `sync` key) before they reach the [`SettingsStore`]. The entry name is
//! bound into each seal, so entries cannot be swapped for one another.

use serde::{de::DeserializeOwned, Serialize};

use vanellus_core::{ProviderKeyPairs, SealedData, SymmetricKey};
use vanellus_store::SettingsStore;

use crate::error::{Result, VanellusError};

/// A key/value cache whose values are sealed at rest.
pub struct SealedCache<S: SettingsStore> {
    store: S,
    key: SymmetricKey,
}

impl<S: SettingsStore> SealedCache<S> {
    pub fn new(store: S, key: SymmetricKey) -> Self {
        Self { store, key }
    }

    /// A cache sealed with the provider's `sync` key.
    pub fn for_provider(store: S, keys: &ProviderKeyPairs) -> Self {
        Self::new(store, keys.sync.clone())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn put<V: Serialize + Sync>(&self, name: &str, value: &V) -> Result<()> {
        let mut plaintext = Vec::new();
        ciborium::into_writer(value, &mut plaintext)
            .map_err(|e| VanellusError::Serialization(e.to_string()))?;

        let sealed = SealedData::seal(&plaintext, &self.key, name.as_bytes())?;
        self.store.set(name, &sealed.to_bytes()?).await?;
        Ok(())
    }

    /// Read an entry. A missing entry is `None`; a tampered one is an error.
    pub async fn get<V: DeserializeOwned>(&self, name: &str) -> Result<Option<V>> {
        let Some(bytes) = self.store.get(name).await? else {
            return Ok(None);
        };

        let sealed = SealedData::from_bytes(&bytes)?;
        let plaintext = sealed.open(&self.key, name.as_bytes())?;
        let value = ciborium::from_reader(plaintext.as_slice())
            .map_err(|e| VanellusError::Decryption(format!("malformed cache entry: {}", e)))?;
        Ok(Some(value))
    }

    pub async fn remove(&self, name: &str) -> Result<bool> {
        Ok(self.store.delete(name).await?)
    }
}
