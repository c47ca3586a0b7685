//! Admin role: root keys and mediator enrollment.

use std::sync::Arc;

use serde_json::{json, Value};

use vanellus_core::{
    AdminKeyPairs, CryptoBackend, MediatorKeyData, MediatorKeyPairs, SoftwareCrypto,
};
use vanellus_transport::{methods, Transport};

use crate::error::Result;

/// Client for the root authority.
pub struct AdminClient<T: Transport> {
    transport: Arc<T>,
    crypto: Arc<dyn CryptoBackend>,
}

impl<T: Transport> AdminClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            crypto: Arc::new(SoftwareCrypto),
        }
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoBackend>) -> Self {
        self.crypto = crypto;
        self
    }

    pub fn generate_key_pairs(&self) -> AdminKeyPairs {
        AdminKeyPairs::generate()
    }

    /// Enroll a new mediator.
    ///
    /// The mediator gets fresh signing and encryption pairs plus a copy of
    /// the admin provider pair; its public keys are published root-signed.
    pub async fn add_mediator(&self, admin: &AdminKeyPairs) -> Result<MediatorKeyPairs> {
        let mediator = MediatorKeyPairs::generate(admin.provider.clone());
        let key_data = MediatorKeyData {
            signing: mediator.signing.public_key.clone(),
            encryption: mediator.encryption.public_key.clone(),
        };
        let signed = self
            .crypto
            .sign(&serde_json::to_string(&key_data)?, &admin.signing)?;

        let _: Value = self
            .transport
            .call(
                methods::ADD_MEDIATOR_PUBLIC_KEYS,
                json!({ "signedKeyData": signed }),
                Some(&admin.signing),
            )
            .await?;

        tracing::debug!("enrolled mediator");
        Ok(mediator)
    }

    /// Wipe all relay state.
    pub async fn reset_db(&self, admin: &AdminKeyPairs) -> Result<()> {
        let _: Value = self
            .transport
            .call(methods::RESET_DB, Value::Null, Some(&admin.signing))
            .await?;
        Ok(())
    }
}
