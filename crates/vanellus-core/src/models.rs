//! Wire records.
//!
//! Every record serializes with camelCase field names. Binary fields are
//! base64 strings; timestamps are Unix milliseconds.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::crypto::{random_bytes, PublicKey};
use crate::envelope::{EcdhEnvelope, SignedData};
use crate::keys::ProviderPublicKeys;

/// Current time as Unix milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// A random identifier: `len` random bytes, base64 encoded.
pub fn random_id(len: usize) -> String {
    codec::to_base64(&random_bytes(len))
}

// ─────────────────────────────────────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────────────────────────────────────

/// What a provider enters about itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInput {
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip_code: String,
    pub description: String,
    pub email: String,
    pub accessible: bool,
}

/// A submission before the relay has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderData {
    #[serde(flatten)]
    pub input: ProviderInput,
    pub public_keys: ProviderPublicKeys,
}

/// A provider as known to itself and to mediators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    #[serde(flatten)]
    pub input: ProviderInput,
    pub public_keys: ProviderPublicKeys,
}

impl Provider {
    pub fn from_data(id: impl Into<String>, data: ProviderData) -> Self {
        Self {
            id: id.into(),
            input: data.input,
            public_keys: data.public_keys,
        }
    }

    /// The record a mediator signs on confirmation (keys excluded).
    pub fn confirmed(&self) -> ConfirmedProvider {
        ConfirmedProvider {
            id: self.id.clone(),
            input: self.input.clone(),
        }
    }

    /// The anonymously visible subset.
    pub fn public(&self) -> PublicProvider {
        PublicProvider {
            id: self.id.clone(),
            name: self.input.name.clone(),
            street: self.input.street.clone(),
            city: self.input.city.clone(),
            zip_code: self.input.zip_code.clone(),
            description: self.input.description.clone(),
            accessible: self.input.accessible,
        }
    }

    /// The key attestation a mediator signs.
    pub fn key_data(&self) -> ProviderKeyData {
        ProviderKeyData {
            id: self.id.clone(),
            signing: self.public_keys.signing.clone(),
            encryption: self.public_keys.encryption.clone(),
            zip_code: self.input.zip_code.clone(),
        }
    }
}

/// A provider record without its public keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedProvider {
    pub id: String,
    #[serde(flatten)]
    pub input: ProviderInput,
}

impl ConfirmedProvider {
    pub fn with_keys(self, public_keys: ProviderPublicKeys) -> Provider {
        Provider {
            id: self.id,
            input: self.input,
            public_keys,
        }
    }
}

/// Provider data any user may see. Carries no email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProvider {
    pub id: String,
    pub name: String,
    pub street: String,
    pub city: String,
    pub zip_code: String,
    pub description: String,
    pub accessible: bool,
}

/// Mediator-attested keys of a verified provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderKeyData {
    /// The provider these keys belong to.
    pub id: String,
    pub signing: PublicKey,
    pub encryption: PublicKey,
    pub zip_code: String,
}

/// The bundle a mediator encrypts back to a provider on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedProvider {
    /// Mediator-signed [`ConfirmedProvider`].
    pub signed_data: SignedData,
    /// Mediator-signed [`ProviderKeyData`].
    pub signed_key_data: SignedData,
}

/// A submission as listed to mediators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedProvider {
    pub id: String,
    pub encrypted_data: EcdhEnvelope,
}

/// A verified provider as published by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProviderEntry {
    /// Mediator-signed [`PublicProvider`].
    pub provider: SignedData,
    /// Mediator-signed [`ProviderKeyData`].
    pub key_data: SignedData,
}

// ─────────────────────────────────────────────────────────────────────────────
// Key directory
// ─────────────────────────────────────────────────────────────────────────────

/// Public keys of an enrolled mediator, signed by the root key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediatorKeyData {
    pub signing: PublicKey,
    pub encryption: PublicKey,
}

/// The trust anchors served by `getKeys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDirectory {
    pub root_key: PublicKey,
    pub token_key: PublicKey,
    pub provider_data: PublicKey,
    #[serde(default)]
    pub mediators: Vec<SignedData>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Appointments
// ─────────────────────────────────────────────────────────────────────────────

/// One bookable seat. An open slot serializes as its id alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    #[serde(default = "default_open", skip_serializing_if = "is_open")]
    pub open: bool,
}

impl Slot {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            open: true,
        }
    }
}

fn default_open() -> bool {
    true
}

fn is_open(open: &bool) -> bool {
    *open
}

/// A time window with one or more slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub timestamp: i64,
    /// Length in minutes.
    pub duration: u32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub slot_data: Vec<Slot>,
    /// Only ever populated locally, after decryption by the provider.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bookings: Vec<Booking>,
    /// Where users encrypt their booking data to.
    pub public_key: PublicKey,
    pub provider: PublicProvider,
    pub updated_at: i64,
}

impl Appointment {
    /// The copy that gets signed and published: no bookings, and slots
    /// reduced to their ids. Booked slots are reported by the relay.
    pub fn published(&self) -> Self {
        Self {
            bookings: Vec::new(),
            slot_data: self.slot_data.iter().map(|slot| Slot::new(&slot.id)).collect(),
            ..self.clone()
        }
    }

    pub fn open_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slot_data.iter().filter(|slot| slot.open)
    }

    /// Cancelled appointments have no capacity left.
    pub fn is_cancelled(&self) -> bool {
        self.slot_data.is_empty()
    }

    pub fn vaccine(&self) -> Option<&str> {
        self.properties.get("vaccine").map(String::as_str)
    }

    pub fn series_id(&self) -> Option<&str> {
        self.properties.get("seriesId").map(String::as_str)
    }
}

/// A regular run of appointments sharing a `seriesId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSeries {
    pub id: String,
    pub start_at: i64,
    pub end_at: i64,
    /// Minutes between consecutive appointments.
    pub interval: u32,
    pub slot_count: usize,
    pub properties: BTreeMap<String, String>,
    pub appointments: Vec<Appointment>,
}

/// A signed appointment as returned by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAppointment {
    #[serde(flatten)]
    pub signed: SignedData,
    /// Encrypted bookings; only served to the owning provider.
    #[serde(default)]
    pub bookings: Vec<Booking>,
    /// Slots already taken; served to anonymous users instead of bookings.
    #[serde(default)]
    pub booked_slots: Vec<Slot>,
}

/// A verified provider with its appointments, as found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAppointments {
    pub provider: SignedData,
    pub key_data: SignedData,
    pub appointments: Vec<SignedAppointment>,
}

/// A verified provider and its verified appointments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedProviderAppointments {
    pub provider: PublicProvider,
    pub key_data: ProviderKeyData,
    pub appointments: Vec<Appointment>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Bookings and tokens
// ─────────────────────────────────────────────────────────────────────────────

/// A reserved slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub slot_id: String,
    pub token: String,
    pub encrypted_data: EcdhEnvelope,
    /// Decrypted contents; provider side only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BookingData>,
}

/// What a user tells the provider when booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingData {
    pub user_token: UserToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactData>,
}

/// Optional contact details a user may share with the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The user-side half of a booking token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserToken {
    pub version: String,
    /// Short code a user can show at the appointment.
    pub code: String,
    /// Commitment to the user's secret and contact data.
    pub hash: String,
}

/// Payload the relay signs with the token key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTokenData {
    pub token: String,
    pub hash: String,
}

/// Everything a user needs to book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub user_token: UserToken,
    pub signed_token: SignedData,
    /// The bearer token from the verified `signed_token`.
    pub token: String,
    /// Contact details shared with providers on booking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactData>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::keys::ProviderKeyPairs;

    fn sample_provider() -> Provider {
        let keys = ProviderKeyPairs::generate();
        Provider {
            id: "p1".into(),
            input: ProviderInput {
                name: "Praxis".into(),
                street: "Hauptstr. 1".into(),
                city: "Berlin".into(),
                zip_code: "10707".into(),
                description: "".into(),
                email: "praxis@example.com".into(),
                accessible: true,
            },
            public_keys: keys.public_keys(),
        }
    }

    fn sample_appointment(provider: &Provider) -> Appointment {
        Appointment {
            id: random_id(32),
            timestamp: 1_700_000_000_000,
            duration: 30,
            properties: BTreeMap::from([("vaccine".to_string(), "biontech".to_string())]),
            slot_data: vec![
                Slot {
                    id: "a".into(),
                    open: true,
                },
                Slot {
                    id: "b".into(),
                    open: false,
                },
            ],
            bookings: Vec::new(),
            public_key: provider.public_keys.encryption.clone(),
            provider: provider.public(),
            updated_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_provider_flattens_input() {
        let provider = sample_provider();
        let json = serde_json::to_value(&provider).unwrap();

        assert_eq!(json["id"], "p1");
        assert_eq!(json["zipCode"], "10707");
        assert!(json["publicKeys"]["signing"].is_string());

        let back: Provider = serde_json::from_value(json).unwrap();
        assert_eq!(back, provider);
    }

    #[test]
    fn test_public_provider_has_no_email() {
        let json = serde_json::to_value(sample_provider().public()).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["name"], "Praxis");
    }

    #[test]
    fn test_confirmed_roundtrip() {
        let provider = sample_provider();
        let confirmed = provider.confirmed();
        let json = serde_json::to_string(&confirmed).unwrap();
        assert!(!json.contains("publicKeys"));

        let back: ConfirmedProvider = serde_json::from_str(&json).unwrap();
        assert_eq!(back.with_keys(provider.public_keys.clone()), provider);
    }

    #[test]
    fn test_slot_open_defaults_true() {
        let slot: Slot = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(slot.open);

        let closed = Slot {
            id: "y".into(),
            open: false,
        };
        let json = serde_json::to_string(&closed).unwrap();
        assert_eq!(serde_json::from_str::<Slot>(&json).unwrap(), closed);
    }

    #[test]
    fn test_key_data_names_its_provider() {
        let provider = sample_provider();
        let key_data = provider.key_data();
        assert_eq!(key_data.id, provider.id);
        assert_eq!(key_data.signing, provider.public_keys.signing);

        let json = serde_json::to_value(&key_data).unwrap();
        assert_eq!(json["id"], "p1");
    }

    #[test]
    fn test_appointment_helpers() {
        let provider = sample_provider();
        let mut appointment = sample_appointment(&provider);

        assert_eq!(appointment.open_slots().count(), 1);
        assert_eq!(appointment.vaccine(), Some("biontech"));
        assert_eq!(appointment.series_id(), None);
        assert!(!appointment.is_cancelled());

        appointment.slot_data.clear();
        assert!(appointment.is_cancelled());
    }

    #[test]
    fn test_published_form_strips_bookings_and_slot_state() {
        let provider = sample_provider();
        let mut appointment = sample_appointment(&provider);
        let recipient = KeyPair::generate_ecdh();
        appointment.bookings.push(Booking {
            id: "b1".into(),
            slot_id: "a".into(),
            token: "t".into(),
            encrypted_data: crate::envelope::ecdh_encrypt_ephemeral("{}", &recipient.public_key)
                .unwrap(),
            data: None,
        });

        let json = serde_json::to_value(appointment.published()).unwrap();
        assert!(json.get("bookings").is_none());
        assert_eq!(json["slotData"], serde_json::json!([{ "id": "a" }, { "id": "b" }]));
        assert_eq!(json["updatedAt"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_signed_appointment_flattens() {
        let keys = KeyPair::generate_ecdsa();
        let signed = crate::envelope::sign("{}", &keys.private_key, &keys.public_key).unwrap();
        let json = serde_json::json!({
            "data": signed.data,
            "signature": codec::to_base64(&signed.signature),
            "bookedSlots": [{"id": "s1"}],
        });

        let parsed: SignedAppointment = serde_json::from_value(json).unwrap();
        assert!(parsed.bookings.is_empty());
        assert_eq!(parsed.booked_slots.len(), 1);
        assert!(parsed.signed.public_key.is_none());
        assert!(parsed.signed.verify(&[keys.public_key]));
    }

    #[test]
    fn test_random_id_unique() {
        let a = random_id(32);
        let b = random_id(32);
        assert_ne!(a, b);
        assert_eq!(codec::from_base64(&a).unwrap().len(), 32);
    }
}
