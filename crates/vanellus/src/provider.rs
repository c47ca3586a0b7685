//! Provider role: submission, verification and appointment management.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use vanellus_core::{
    now_millis, random_id, Appointment, AppointmentSeries, Booking, BookingData, ConfirmedProvider,
    EcdhEnvelope, Provider, ProviderData, ProviderInput, ProviderKeyData, ProviderKeyPairs,
    PublicProvider, Secret, SignedAppointment, SignedData, SignedProvider, Slot,
};
use vanellus_transport::{methods, Transport};

use crate::anonymous::AnonymousClient;
use crate::config::ClientConfig;
use crate::error::{Result, VanellusError};

/// Length of appointment and series ids, in bytes.
const APPOINTMENT_ID_LENGTH: usize = 32;

/// Most appointments one series may create.
pub const MAX_SERIES_LENGTH: usize = 5_000;

/// Where a provider stands in verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Nothing submitted yet.
    Unsubmitted,
    /// Submitted, waiting for a mediator.
    Pending,
    /// Confirmed by a mediator.
    Verified,
}

/// State a provider backs up under its secret.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderBackup {
    #[serde(default)]
    pub key_pairs: Option<ProviderKeyPairs>,
    #[serde(default)]
    pub verified_provider: Option<Provider>,
    /// Appointments created but not yet published.
    #[serde(default)]
    pub unpublished_appointments: Vec<Appointment>,
}

/// Client for the provider role.
pub struct ProviderClient<T: Transport> {
    anonymous: AnonymousClient<T>,
}

impl<T: Transport> ProviderClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self::from_anonymous(AnonymousClient::new(transport))
    }

    pub fn with_config(transport: Arc<T>, config: ClientConfig) -> Self {
        Self::from_anonymous(AnonymousClient::with_config(transport, config))
    }

    pub fn from_anonymous(anonymous: AnonymousClient<T>) -> Self {
        Self { anonymous }
    }

    /// The anonymous capabilities (discovery, key directory).
    pub fn anonymous(&self) -> &AnonymousClient<T> {
        &self.anonymous
    }

    pub fn generate_key_pairs(&self) -> ProviderKeyPairs {
        ProviderKeyPairs::generate()
    }

    pub fn generate_secret(&self) -> Secret {
        Secret::generate(self.anonymous.config().secret_length)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verification lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Submit provider data for review.
    ///
    /// The data is encrypted to the directory's `providerData` key, so only
    /// mediators can read it. Re-submitting does not revoke an existing
    /// confirmation.
    pub async fn store_provider(
        &self,
        input: ProviderInput,
        keys: &ProviderKeyPairs,
        code: Option<&str>,
    ) -> Result<Provider> {
        #[derive(Deserialize)]
        struct Stored {
            id: String,
        }

        let directory = self.anonymous.get_keys().await?;
        let data = ProviderData {
            input,
            public_keys: keys.public_keys(),
        };

        let payload = serde_json::to_string(&data)?;
        let encrypted = self
            .anonymous
            .crypto()
            .ecdh_encrypt(&payload, &keys.data, &directory.provider_data)?;

        let stored: Stored = self
            .anonymous
            .call(
                methods::STORE_PROVIDER_DATA,
                json!({ "encryptedData": encrypted, "code": code }),
                Some(&keys.signing),
            )
            .await?;

        tracing::debug!(provider_id = %stored.id, "submitted provider data");
        Ok(Provider::from_data(stored.id, data))
    }

    /// Fetch the mediator confirmation, if there is one.
    ///
    /// `Ok(None)` means no mediator has confirmed this provider yet. A
    /// confirmation that is present but fails any check is an error.
    pub async fn check_provider(&self, keys: &ProviderKeyPairs) -> Result<Option<Provider>> {
        let confirmation: Option<SignedData> = self
            .anonymous
            .call(methods::CHECK_PROVIDER_DATA, Value::Null, Some(&keys.signing))
            .await?;
        let Some(confirmation) = confirmation else {
            return Ok(None);
        };

        let directory = self.anonymous.get_keys().await?;
        let mediators = self.anonymous.mediator_keys(&directory);
        let signing_keys: Vec<_> = mediators.iter().map(|m| m.signing.clone()).collect();

        let envelope: EcdhEnvelope = self.anonymous.open_signed(&confirmation, &signing_keys)?;
        if !mediators
            .iter()
            .any(|m| m.encryption == envelope.ephemeral_public_key)
        {
            return Err(VanellusError::Verification(
                "confirmation was not encrypted by a mediator".into(),
            ));
        }

        let plaintext = self
            .anonymous
            .crypto()
            .ecdh_decrypt(&envelope, &keys.data.private_key)?;
        let bundle: SignedProvider = serde_json::from_str(&plaintext)
            .map_err(|e| VanellusError::Decryption(format!("malformed confirmation: {}", e)))?;

        let confirmed: ConfirmedProvider =
            self.anonymous.open_signed(&bundle.signed_data, &signing_keys)?;
        let key_data: ProviderKeyData =
            self.anonymous.open_signed(&bundle.signed_key_data, &signing_keys)?;
        if key_data.id != confirmed.id
            || key_data.signing != keys.signing.public_key
            || key_data.encryption != keys.encryption.public_key
        {
            return Err(VanellusError::Verification(
                "confirmation attests different keys".into(),
            ));
        }

        Ok(Some(confirmed.with_keys(keys.public_keys())))
    }

    /// Where this provider stands. `submitted` is the locally known submission.
    pub async fn status(
        &self,
        keys: &ProviderKeyPairs,
        submitted: Option<&Provider>,
    ) -> Result<ProviderStatus> {
        if self.check_provider(keys).await?.is_some() {
            return Ok(ProviderStatus::Verified);
        }
        Ok(match submitted {
            Some(_) => ProviderStatus::Pending,
            None => ProviderStatus::Unsubmitted,
        })
    }

    /// The confirmed provider record, or a state error while still pending.
    pub async fn require_verified(&self, keys: &ProviderKeyPairs) -> Result<Provider> {
        self.check_provider(keys)
            .await?
            .ok_or_else(|| VanellusError::State("provider is not verified yet".into()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Appointments
    // ─────────────────────────────────────────────────────────────────────────

    /// Build an appointment locally. Nothing is sent until it is published.
    pub fn create_appointment(
        &self,
        duration: u32,
        vaccine: &str,
        slot_count: usize,
        timestamp: i64,
        provider: &PublicProvider,
        keys: &ProviderKeyPairs,
    ) -> Result<Appointment> {
        if provider.id.is_empty() {
            return Err(VanellusError::State("provider has not been stored".into()));
        }

        let slot_id_length = self.anonymous.config().slot_id_length;
        let slot_data = (0..slot_count)
            .map(|_| Slot::new(random_id(slot_id_length)))
            .collect();

        Ok(Appointment {
            id: random_id(APPOINTMENT_ID_LENGTH),
            timestamp,
            duration,
            properties: BTreeMap::from([("vaccine".to_string(), vaccine.to_string())]),
            slot_data,
            bookings: Vec::new(),
            public_key: keys.encryption.public_key.clone(),
            provider: provider.clone(),
            updated_at: now_millis(),
        })
    }

    /// One appointment every `interval_minutes` in `[start_at, end_at)`.
    ///
    /// Fails if the series would hold more than [`MAX_SERIES_LENGTH`]
    /// appointments.
    #[allow(clippy::too_many_arguments)]
    pub fn create_appointment_series(
        &self,
        start_at: i64,
        end_at: i64,
        interval_minutes: u32,
        slot_count: usize,
        vaccine: &str,
        provider: &PublicProvider,
        keys: &ProviderKeyPairs,
    ) -> Result<AppointmentSeries> {
        if interval_minutes == 0 {
            return Err(VanellusError::State("series interval must be positive".into()));
        }
        if end_at <= start_at {
            return Err(VanellusError::State("series ends before it starts".into()));
        }

        let series_id = random_id(APPOINTMENT_ID_LENGTH);
        let step = i64::from(interval_minutes) * 60_000;
        let mut appointments = Vec::new();
        let mut timestamp = start_at;
        while timestamp < end_at {
            if appointments.len() == MAX_SERIES_LENGTH {
                return Err(VanellusError::State(format!(
                    "series would exceed {} appointments",
                    MAX_SERIES_LENGTH
                )));
            }
            let mut appointment = self.create_appointment(
                interval_minutes,
                vaccine,
                slot_count,
                timestamp,
                provider,
                keys,
            )?;
            appointment
                .properties
                .insert("seriesId".to_string(), series_id.clone());
            appointments.push(appointment);
            timestamp = timestamp
                .checked_add(step)
                .ok_or_else(|| VanellusError::State("series runs past the last timestamp".into()))?;
        }

        Ok(AppointmentSeries {
            id: series_id,
            start_at,
            end_at,
            interval: interval_minutes,
            slot_count,
            properties: BTreeMap::from([("vaccine".to_string(), vaccine.to_string())]),
            appointments,
        })
    }

    /// Sign and publish appointments.
    ///
    /// Each appointment is signed on its own, without bookings and with its
    /// slots reduced to ids. Returns the public copies.
    pub async fn publish_appointments(
        &self,
        appointments: &[Appointment],
        keys: &ProviderKeyPairs,
    ) -> Result<Vec<Appointment>> {
        self.require_verified(keys).await?;

        let public: Vec<Appointment> = appointments.iter().map(Appointment::published).collect();
        let signed = public
            .iter()
            .map(|appointment| self.anonymous.sign_json(appointment, &keys.signing))
            .collect::<Result<Vec<SignedData>>>()?;

        let _: Value = self
            .anonymous
            .call(
                methods::PUBLISH_APPOINTMENTS,
                json!({ "appointments": signed }),
                Some(&keys.signing),
            )
            .await?;

        tracing::debug!(count = public.len(), "published appointments");
        Ok(public)
    }

    /// Cancel by removing every slot and republishing.
    pub async fn cancel_appointment(
        &self,
        appointment: &Appointment,
        keys: &ProviderKeyPairs,
    ) -> Result<Appointment> {
        let mut cancelled = appointment.clone();
        cancelled.slot_data.clear();
        cancelled.updated_at = now_millis();

        let mut published = self.publish_appointments(&[cancelled], keys).await?;
        published
            .pop()
            .ok_or_else(|| VanellusError::State("nothing was published".into()))
    }

    /// This provider's appointments between `from` and `to`, bookings decrypted.
    ///
    /// Appointments that do not verify under our own key are skipped. A
    /// booking that fails to decrypt fails the whole call.
    pub async fn get_provider_appointments(
        &self,
        from: i64,
        to: i64,
        keys: &ProviderKeyPairs,
    ) -> Result<Vec<Appointment>> {
        let signed: Vec<SignedAppointment> = self
            .anonymous
            .call(
                methods::GET_PROVIDER_APPOINTMENTS,
                json!({ "from": from, "to": to }),
                Some(&keys.signing),
            )
            .await?;

        let own_key = std::slice::from_ref(&keys.signing.public_key);
        let mut seen = HashSet::new();
        let mut appointments = Vec::with_capacity(signed.len());

        for entry in signed {
            let opened = self.anonymous.open_signed::<Appointment>(&entry.signed, own_key);
            let mut appointment = match opened {
                Ok(appointment) => appointment,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unverifiable appointment");
                    continue;
                }
            };
            if !seen.insert(appointment.id.clone()) {
                continue;
            }

            appointment.bookings = self.decrypt_bookings(entry.bookings, keys)?;
            appointments.push(appointment);
        }

        Ok(appointments)
    }

    fn decrypt_bookings(
        &self,
        bookings: Vec<Booking>,
        keys: &ProviderKeyPairs,
    ) -> Result<Vec<Booking>> {
        bookings
            .into_iter()
            .map(|mut booking| -> Result<Booking> {
                let plaintext = self
                    .anonymous
                    .crypto()
                    .ecdh_decrypt(&booking.encrypted_data, &keys.encryption.private_key)?;
                let data: BookingData = serde_json::from_str(&plaintext)
                    .map_err(|e| VanellusError::Decryption(format!("malformed booking: {}", e)))?;
                booking.data = Some(data);
                Ok(booking)
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Backup
    // ─────────────────────────────────────────────────────────────────────────

    /// Seal and upload provider state under `secret`.
    pub async fn backup_data(&self, backup: &ProviderBackup, secret: &Secret) -> Result<()> {
        self.anonymous.store_backup(backup, secret).await
    }

    /// Download and open the state stored under `secret`.
    pub async fn restore_from_backup(&self, secret: &Secret) -> Result<ProviderBackup> {
        self.anonymous.load_backup(secret).await
    }
}
