//! User role: tokens, booking and cancellation.
//!
//! Users have no key pair. A bearer secret and a relay-signed token are all
//! they hold; booking data is encrypted with a one-time key.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use vanellus_core::{
    random_id, Appointment, Booking, BookingData, ContactData, Secret, SignedData,
    SignedTokenData, TokenData, UserToken,
};
use vanellus_transport::{methods, Transport};

use crate::anonymous::AnonymousClient;
use crate::config::ClientConfig;
use crate::error::{Result, VanellusError};

/// Characters of the secret shown as the booking code.
const CODE_LENGTH: usize = 4;

/// State a user backs up under its secret.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBackup {
    #[serde(default)]
    pub token_data: Option<TokenData>,
    #[serde(default)]
    pub booked_appointments: Vec<Appointment>,
}

/// Client for the user role.
pub struct UserClient<T: Transport> {
    anonymous: AnonymousClient<T>,
}

impl<T: Transport> UserClient<T> {
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

    pub fn generate_secret(&self) -> Secret {
        Secret::generate(self.anonymous.config().secret_length)
    }

    /// Obtain a booking token from the relay.
    ///
    /// The token is bound to a hash over the secret and contact data; the
    /// relay's signature is checked against the directory token key.
    pub async fn get_token(
        &self,
        secret: &Secret,
        contact: Option<ContactData>,
    ) -> Result<TokenData> {
        let nonce = random_id(16);
        let mut hasher = Sha256::new();
        hasher.update(secret.as_str().as_bytes());
        hasher.update(serde_json::to_string(&contact)?.as_bytes());
        hasher.update(nonce.as_bytes());
        let hash = hex::encode(hasher.finalize());

        let code: String = secret.as_str().chars().take(CODE_LENGTH).collect();
        let user_token = UserToken {
            version: self.anonymous.config().token_version.clone(),
            code: code.clone(),
            hash: hash.clone(),
        };

        let signed_token: SignedData = self
            .anonymous
            .call(
                methods::GET_TOKEN,
                json!({ "hash": hash, "code": code }),
                None,
            )
            .await?;

        let directory = self.anonymous.get_keys().await?;
        let payload: SignedTokenData = self
            .anonymous
            .open_signed(&signed_token, std::slice::from_ref(&directory.token_key))?;
        if payload.hash != hash {
            return Err(VanellusError::Verification(
                "token was issued for a different hash".into(),
            ));
        }

        Ok(TokenData {
            user_token,
            signed_token,
            token: payload.token,
            contact,
        })
    }

    /// Book the first open slot of `appointment`.
    ///
    /// The booking data is encrypted to the appointment key with a one-time
    /// sender key, so only the provider can read it.
    pub async fn book_appointment(
        &self,
        appointment: &Appointment,
        token: &TokenData,
    ) -> Result<Booking> {
        let slot = appointment
            .open_slots()
            .next()
            .ok_or_else(|| VanellusError::State("appointment has no open slot".into()))?;

        let data = BookingData {
            user_token: token.user_token.clone(),
            contact: token.contact.clone(),
        };
        let encrypted = self
            .anonymous
            .crypto()
            .ecdh_encrypt_ephemeral(&serde_json::to_string(&data)?, &appointment.public_key)?;

        let booking: Booking = self
            .anonymous
            .call(
                methods::BOOK_APPOINTMENT,
                json!({
                    "id": appointment.id,
                    "providerID": appointment.provider.id,
                    "slotID": slot.id,
                    "token": token.token,
                    "encryptedData": encrypted,
                }),
                None,
            )
            .await?;

        tracing::debug!(appointment_id = %appointment.id, "booked appointment");
        Ok(booking)
    }

    /// Cancel this token's booking of `appointment`.
    pub async fn cancel_booking(&self, appointment: &Appointment, token: &TokenData) -> Result<()> {
        let _: Value = self
            .anonymous
            .call(
                methods::CANCEL_BOOKING,
                json!({
                    "id": appointment.id,
                    "providerID": appointment.provider.id,
                    "token": token.token,
                }),
                None,
            )
            .await?;
        Ok(())
    }

    /// Seal and upload user state under `secret`.
    pub async fn backup_data(&self, backup: &UserBackup, secret: &Secret) -> Result<()> {
        self.anonymous.store_backup(backup, secret).await
    }

    /// Download and open the state stored under `secret`.
    pub async fn restore_from_backup(&self, secret: &Secret) -> Result<UserBackup> {
        self.anonymous.load_backup(secret).await
    }
}
