//! Mediator role: reviewing and confirming providers.

use std::sync::Arc;

use serde_json::{json, Value};

use vanellus_core::{EncryptedProvider, MediatorKeyPairs, Provider, ProviderData, SignedProvider};
use vanellus_transport::{methods, Transport};

use crate::anonymous::AnonymousClient;
use crate::config::ClientConfig;
use crate::error::{Result, VanellusError};

/// Decrypted submissions, plus the ones that could not be opened.
#[derive(Debug, Default)]
pub struct ProviderListing {
    pub providers: Vec<Provider>,
    pub failed: Vec<FailedSubmission>,
}

/// A listed submission that failed to decrypt or verify.
#[derive(Debug)]
pub struct FailedSubmission {
    pub id: String,
    pub error: VanellusError,
}

/// Client for the mediator role.
pub struct MediatorClient<T: Transport> {
    anonymous: AnonymousClient<T>,
}

impl<T: Transport> MediatorClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self::from_anonymous(AnonymousClient::new(transport))
    }

    pub fn with_config(transport: Arc<T>, config: ClientConfig) -> Self {
        Self::from_anonymous(AnonymousClient::with_config(transport, config))
    }

    pub fn from_anonymous(anonymous: AnonymousClient<T>) -> Self {
        Self { anonymous }
    }

    pub fn anonymous(&self) -> &AnonymousClient<T> {
        &self.anonymous
    }

    /// Submissions waiting for review, still encrypted.
    pub async fn list_pending(
        &self,
        limit: Option<usize>,
        keys: &MediatorKeyPairs,
    ) -> Result<Vec<EncryptedProvider>> {
        self.list(methods::GET_PENDING_PROVIDER_DATA, limit, keys).await
    }

    /// Submissions already confirmed, still encrypted.
    pub async fn list_verified(
        &self,
        limit: Option<usize>,
        keys: &MediatorKeyPairs,
    ) -> Result<Vec<EncryptedProvider>> {
        self.list(methods::GET_VERIFIED_PROVIDER_DATA, limit, keys).await
    }

    async fn list(
        &self,
        method: &str,
        limit: Option<usize>,
        keys: &MediatorKeyPairs,
    ) -> Result<Vec<EncryptedProvider>> {
        let limit = limit.or(self.anonymous.config().list_limit);
        self.anonymous
            .call(method, json!({ "limit": limit }), Some(&keys.signing))
            .await
    }

    /// One submission by provider id.
    pub async fn get_provider_data(
        &self,
        id: &str,
        keys: &MediatorKeyPairs,
    ) -> Result<EncryptedProvider> {
        self.anonymous
            .call(methods::GET_PROVIDER_DATA, json!({ "id": id }), Some(&keys.signing))
            .await
    }

    /// Decrypt a submission with the entrusted provider key.
    ///
    /// The submission must have been encrypted from the data key it lists.
    pub fn decrypt_provider(
        &self,
        encrypted: &EncryptedProvider,
        keys: &MediatorKeyPairs,
    ) -> Result<Provider> {
        let plaintext = self
            .anonymous
            .crypto()
            .ecdh_decrypt(&encrypted.encrypted_data, &keys.provider.private_key)?;
        let data: ProviderData = serde_json::from_str(&plaintext)
            .map_err(|e| VanellusError::Decryption(format!("malformed provider data: {}", e)))?;

        if data.public_keys.data != encrypted.encrypted_data.ephemeral_public_key {
            return Err(VanellusError::Verification(
                "submission was not sent from its own data key".into(),
            ));
        }

        Ok(Provider::from_data(encrypted.id.clone(), data))
    }

    /// Fetch and decrypt pending submissions.
    ///
    /// Submissions that fail to open are reported in
    /// [`ProviderListing::failed`] rather than failing the call.
    pub async fn get_pending_providers(
        &self,
        limit: Option<usize>,
        keys: &MediatorKeyPairs,
    ) -> Result<ProviderListing> {
        let encrypted = self.list_pending(limit, keys).await?;
        Ok(self.decrypt_all(&encrypted, keys))
    }

    /// Fetch and decrypt verified submissions, like [`Self::get_pending_providers`].
    pub async fn get_verified_providers(
        &self,
        limit: Option<usize>,
        keys: &MediatorKeyPairs,
    ) -> Result<ProviderListing> {
        let encrypted = self.list_verified(limit, keys).await?;
        Ok(self.decrypt_all(&encrypted, keys))
    }

    fn decrypt_all(
        &self,
        encrypted: &[EncryptedProvider],
        keys: &MediatorKeyPairs,
    ) -> ProviderListing {
        let mut listing = ProviderListing::default();
        for entry in encrypted {
            match self.decrypt_provider(entry, keys) {
                Ok(provider) => listing.providers.push(provider),
                Err(error) => {
                    tracing::warn!(
                        provider_id = %entry.id,
                        error = %error,
                        "unreadable submission"
                    );
                    listing.failed.push(FailedSubmission {
                        id: entry.id.clone(),
                        error,
                    });
                }
            }
        }
        listing
    }

    /// Confirm a provider.
    ///
    /// Signs the provider record, its public subset and its key attestation;
    /// encrypts the record and attestation back to the provider's data key;
    /// and uploads all of it in one call.
    pub async fn confirm_provider(
        &self,
        provider: &Provider,
        keys: &MediatorKeyPairs,
    ) -> Result<()> {
        let signed_data = self.anonymous.sign_json(&provider.confirmed(), &keys.signing)?;
        let public_data = self.anonymous.sign_json(&provider.public(), &keys.signing)?;
        let signed_key_data = self.anonymous.sign_json(&provider.key_data(), &keys.signing)?;

        let bundle = SignedProvider {
            signed_data,
            signed_key_data: signed_key_data.clone(),
        };
        let encrypted = self.anonymous.crypto().ecdh_encrypt(
            &serde_json::to_string(&bundle)?,
            &keys.encryption,
            &provider.public_keys.data,
        )?;
        let confirmed_data = self.anonymous.sign_json(&encrypted, &keys.signing)?;

        let _: Value = self
            .anonymous
            .call(
                methods::CONFIRM_PROVIDER,
                json!({
                    "confirmedProviderData": confirmed_data,
                    "publicProviderData": public_data,
                    "signedKeyData": signed_key_data,
                }),
                Some(&keys.signing),
            )
            .await?;

        tracing::debug!(provider_id = %provider.id, "confirmed provider");
        Ok(())
    }
}
