//! Anonymous access: the key directory and appointment discovery.
//!
//! Everything the relay hands out here is checked against the mediator keys
//! the root key vouches for before it is returned.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use vanellus_core::{
    open_backup, seal_backup, Appointment, CryptoBackend, KeyDirectory, KeyPair, MediatorKeyData,
    ProviderAppointments, ProviderKeyData, PublicKey, PublicProvider, PublicProviderEntry,
    SealedData, Secret, SignedAppointment, SignedData, SoftwareCrypto,
    VerifiedProviderAppointments,
};
use vanellus_transport::{methods, Transport, TransportError};

use crate::config::ClientConfig;
use crate::error::{Result, VanellusError};

/// Client for calls that need no identity.
///
/// The other role clients wrap one of these.
pub struct AnonymousClient<T: Transport> {
    transport: Arc<T>,
    crypto: Arc<dyn CryptoBackend>,
    config: ClientConfig,
}

impl<T: Transport> Clone for AnonymousClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            crypto: Arc::clone(&self.crypto),
            config: self.config.clone(),
        }
    }
}

impl<T: Transport> AnonymousClient<T> {
    /// Create a client with the default configuration.
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    /// Create a client with the given configuration.
    pub fn with_config(transport: Arc<T>, config: ClientConfig) -> Self {
        Self {
            transport,
            crypto: Arc::new(SoftwareCrypto),
            config,
        }
    }

    /// Swap the crypto back end.
    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoBackend>) -> Self {
        self.crypto = crypto;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn crypto(&self) -> &dyn CryptoBackend {
        self.crypto.as_ref()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Plumbing shared with the role clients
    // ─────────────────────────────────────────────────────────────────────────

    /// Call the relay and parse the result.
    pub(crate) async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        signing_key: Option<&KeyPair>,
    ) -> Result<R> {
        let value = self.transport.call(method, params, signing_key).await?;
        serde_json::from_value(value).map_err(|e| {
            VanellusError::Transport(TransportError::InvalidResponse(format!("{}: {}", method, e)))
        })
    }

    /// Sign a value serialized as JSON.
    pub(crate) fn sign_json<V: Serialize>(
        &self,
        value: &V,
        key_pair: &KeyPair,
    ) -> Result<SignedData> {
        let payload = serde_json::to_string(value)?;
        Ok(self.crypto.sign(&payload, key_pair)?)
    }

    /// Verify against `candidates`, then parse the payload.
    pub(crate) fn open_signed<R: DeserializeOwned>(
        &self,
        signed: &SignedData,
        candidates: &[PublicKey],
    ) -> Result<R> {
        if !self.crypto.verify(candidates, signed) {
            return Err(VanellusError::Verification(
                "no trusted key validates the signature".into(),
            ));
        }
        serde_json::from_str(&signed.data)
            .map_err(|e| VanellusError::Verification(format!("malformed signed payload: {}", e)))
    }

    /// Seal `state` under `secret` and upload it.
    pub(crate) async fn store_backup<S: Serialize>(
        &self,
        state: &S,
        secret: &Secret,
    ) -> Result<()> {
        let sealed = seal_backup(state, secret)?;
        let _: Value = self
            .call(
                methods::STORE_SETTINGS,
                json!({ "id": secret.storage_id()?, "data": sealed }),
                None,
            )
            .await?;
        Ok(())
    }

    /// Download and open the backup stored under `secret`.
    pub(crate) async fn load_backup<S: DeserializeOwned>(&self, secret: &Secret) -> Result<S> {
        let sealed: Option<SealedData> = self
            .call(methods::GET_SETTINGS, json!({ "id": secret.storage_id()? }), None)
            .await?;
        let sealed = sealed.ok_or_else(|| VanellusError::State("no backup found".into()))?;
        Ok(open_backup(&sealed, secret)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Key directory
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch the key directory.
    pub async fn get_keys(&self) -> Result<KeyDirectory> {
        let keys: KeyDirectory = self.call(methods::GET_KEYS, Value::Null, None).await?;
        if let Some(pinned) = &self.config.root_key {
            if &keys.root_key != pinned {
                return Err(VanellusError::Verification(
                    "key directory names an unexpected root key".into(),
                ));
            }
        }
        Ok(keys)
    }

    /// Mediator keys the root key vouches for. Unverifiable entries are dropped.
    pub fn mediator_keys(&self, keys: &KeyDirectory) -> Vec<MediatorKeyData> {
        let root = std::slice::from_ref(&keys.root_key);
        keys.mediators
            .iter()
            .filter_map(|signed| match self.open_signed::<MediatorKeyData>(signed, root) {
                Ok(mediator) => Some(mediator),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping mediator entry");
                    None
                }
            })
            .collect()
    }

    /// Signing keys of trusted mediators.
    pub fn mediator_signing_keys(&self, keys: &KeyDirectory) -> Vec<PublicKey> {
        self.mediator_keys(keys)
            .into_iter()
            .map(|mediator| mediator.signing)
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Discovery
    // ─────────────────────────────────────────────────────────────────────────

    /// Verified providers with a zip code in `[zip_from, zip_to]`.
    pub async fn get_providers_by_zip_code(
        &self,
        zip_from: &str,
        zip_to: &str,
    ) -> Result<Vec<PublicProvider>> {
        let entries: Vec<PublicProviderEntry> = self
            .call(
                methods::GET_PROVIDERS_BY_ZIP_CODE,
                json!({ "zipFrom": zip_from, "zipTo": zip_to }),
                None,
            )
            .await?;

        let keys = self.get_keys().await?;
        let mediators = self.mediator_signing_keys(&keys);

        let mut providers = Vec::with_capacity(entries.len());
        for entry in &entries {
            match self.verify_provider(&entry.provider, &entry.key_data, &mediators) {
                Ok((provider, _)) => providers.push(provider),
                Err(e) => self.skip_or_fail("provider", e)?,
            }
        }
        Ok(providers)
    }

    /// Open appointments near `zip_code` between `from` and `to` (Unix ms).
    ///
    /// Booked slots come back closed; cancelled appointments are left out.
    pub async fn get_appointments_by_zip_code(
        &self,
        zip_code: &str,
        radius: u32,
        from: i64,
        to: i64,
    ) -> Result<Vec<VerifiedProviderAppointments>> {
        let entries: Vec<ProviderAppointments> = self
            .call(
                methods::GET_APPOINTMENTS_BY_ZIP_CODE,
                json!({ "zipCode": zip_code, "radius": radius, "from": from, "to": to }),
                None,
            )
            .await?;

        let keys = self.get_keys().await?;
        let mediators = self.mediator_signing_keys(&keys);

        let mut results = Vec::with_capacity(entries.len());
        for entry in &entries {
            let (provider, key_data) =
                match self.verify_provider(&entry.provider, &entry.key_data, &mediators) {
                    Ok(verified) => verified,
                    Err(e) => {
                        self.skip_or_fail("provider", e)?;
                        continue;
                    }
                };

            let mut appointments = Vec::with_capacity(entry.appointments.len());
            for signed in &entry.appointments {
                match self.verify_appointment(signed, &provider, &key_data) {
                    Ok(appointment) if appointment.is_cancelled() => {}
                    Ok(appointment) => appointments.push(appointment),
                    Err(e) => self.skip_or_fail("appointment", e)?,
                }
            }

            if !appointments.is_empty() {
                results.push(VerifiedProviderAppointments {
                    provider,
                    key_data,
                    appointments,
                });
            }
        }

        tracing::debug!(providers = results.len(), zip_code, "discovered appointments");
        Ok(results)
    }

    /// Fetch and verify a single appointment.
    pub async fn get_appointment(&self, id: &str, provider_id: &str) -> Result<Appointment> {
        let entry: ProviderAppointments = self
            .call(
                methods::GET_APPOINTMENT,
                json!({ "id": id, "providerID": provider_id }),
                None,
            )
            .await?;

        let keys = self.get_keys().await?;
        let mediators = self.mediator_signing_keys(&keys);
        let (provider, key_data) =
            self.verify_provider(&entry.provider, &entry.key_data, &mediators)?;

        let signed = entry
            .appointments
            .first()
            .ok_or_else(|| VanellusError::State("relay returned no appointment".into()))?;
        let appointment = self.verify_appointment(signed, &provider, &key_data)?;
        if appointment.id != id {
            return Err(VanellusError::Verification(
                "relay returned a different appointment".into(),
            ));
        }
        Ok(appointment)
    }

    fn verify_provider(
        &self,
        provider: &SignedData,
        key_data: &SignedData,
        mediators: &[PublicKey],
    ) -> Result<(PublicProvider, ProviderKeyData)> {
        let provider: PublicProvider = self.open_signed(provider, mediators)?;
        let key_data: ProviderKeyData = self.open_signed(key_data, mediators)?;
        if key_data.id != provider.id {
            return Err(VanellusError::Verification(
                "key data belongs to another provider".into(),
            ));
        }
        if provider.zip_code != key_data.zip_code {
            return Err(VanellusError::Verification(
                "provider and key data disagree".into(),
            ));
        }
        Ok((provider, key_data))
    }

    fn verify_appointment(
        &self,
        signed: &SignedAppointment,
        provider: &PublicProvider,
        key_data: &ProviderKeyData,
    ) -> Result<Appointment> {
        let mut appointment: Appointment =
            self.open_signed(&signed.signed, std::slice::from_ref(&key_data.signing))?;

        if appointment.public_key != key_data.encryption {
            return Err(VanellusError::Verification(
                "appointment key is not attested".into(),
            ));
        }
        if appointment.provider.id != provider.id {
            return Err(VanellusError::Verification(
                "appointment names another provider".into(),
            ));
        }

        appointment.bookings.clear();
        for slot in &mut appointment.slot_data {
            if signed.booked_slots.iter().any(|booked| booked.id == slot.id) {
                slot.open = false;
            }
        }
        Ok(appointment)
    }

    fn skip_or_fail(&self, what: &str, err: VanellusError) -> Result<()> {
        if self.config.strict_discovery {
            return Err(err);
        }
        tracing::warn!(error = %err, "skipping unverifiable {}", what);
        Ok(())
    }
}
