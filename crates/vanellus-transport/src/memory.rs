//! A simple in-memory relay for testing.
//!
//! Implements every relay method with just enough storage and matching to
//! drive the client protocols end to end. Like the real relay it only ever
//! holds signed or encrypted data; it checks request signatures and the
//! mediator signatures it is handed, nothing more.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use vanellus_core::{
    random_id, AdminKeyPairs, Appointment, Booking, EcdhEnvelope, EncryptedProvider, KeyDirectory,
    KeyPair, MediatorKeyData, ProviderAppointments, ProviderKeyData, PublicKey, PublicProvider,
    PublicProviderEntry, SignedAppointment, SignedData, SignedTokenData, Slot,
};

use crate::error::{Result, TransportError};
use crate::methods;
use crate::transport::Transport;

/// Length of relay-issued random identifiers, in bytes.
const ID_LENGTH: usize = 32;

/// The id the relay assigns to a provider: hex BLAKE3 of its signing key.
pub fn provider_id(signing_key: &PublicKey) -> String {
    hex::encode(blake3::hash(signing_key.as_bytes()).as_bytes())
}

/// In-memory relay implementing [`Transport`].
pub struct MemoryRelay {
    root_key: PublicKey,
    token_key: KeyPair,
    provider_data_key: PublicKey,
    state: RwLock<RelayState>,
}

#[derive(Default)]
struct RelayState {
    offline: bool,
    /// Root-signed [`MediatorKeyData`] records.
    mediators: Vec<SignedData>,
    /// Signing keys allowed to call mediator methods.
    mediator_keys: Vec<PublicKey>,
    providers: BTreeMap<String, StoredProvider>,
    /// Mediator-signed encrypted confirmations, by provider id.
    confirmations: HashMap<String, SignedData>,
    public_providers: BTreeMap<String, StoredPublicProvider>,
    /// Appointments by provider id, then appointment id.
    appointments: HashMap<String, BTreeMap<String, StoredAppointment>>,
    /// Issued tokens and the user hash they were issued for.
    tokens: HashMap<String, String>,
    settings: HashMap<String, Value>,
}

struct StoredProvider {
    encrypted_data: EcdhEnvelope,
    pending: bool,
    verified: bool,
}

struct StoredPublicProvider {
    zip: Option<u32>,
    entry: PublicProviderEntry,
}

struct StoredAppointment {
    signed: SignedData,
    timestamp: i64,
    slot_ids: Vec<String>,
    bookings: Vec<Booking>,
}

impl StoredAppointment {
    fn booked_slots(&self) -> Vec<Slot> {
        self.bookings
            .iter()
            .filter(|b| self.slot_ids.contains(&b.slot_id))
            .map(|b| Slot {
                id: b.slot_id.clone(),
                open: false,
            })
            .collect()
    }

    fn public_view(&self) -> SignedAppointment {
        SignedAppointment {
            signed: self.signed.clone(),
            bookings: Vec::new(),
            booked_slots: self.booked_slots(),
        }
    }

    fn owner_view(&self) -> SignedAppointment {
        SignedAppointment {
            signed: self.signed.clone(),
            bookings: self.bookings.clone(),
            booked_slots: Vec::new(),
        }
    }
}

impl MemoryRelay {
    /// Create a relay anchored on the given admin keys.
    ///
    /// The relay keeps the private token key to sign user tokens; of the
    /// other admin pairs it only learns the public halves.
    pub fn new(admin: &AdminKeyPairs) -> Self {
        Self {
            root_key: admin.signing.public_key.clone(),
            token_key: admin.token.clone(),
            provider_data_key: admin.provider.public_key.clone(),
            state: RwLock::new(RelayState::default()),
        }
    }

    /// Simulate the relay being unreachable.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.write() {
            state.offline = offline;
        }
    }

    fn read(&self, method: &str) -> Result<RwLockReadGuard<'_, RelayState>> {
        self.state
            .read()
            .map_err(|_| TransportError::server(method, "relay state poisoned"))
    }

    fn write(&self, method: &str) -> Result<RwLockWriteGuard<'_, RelayState>> {
        self.state
            .write()
            .map_err(|_| TransportError::server(method, "relay state poisoned"))
    }

    fn dispatch(&self, method: &str, params: Value, caller: Option<&PublicKey>) -> Result<Value> {
        if self.read(method)?.offline {
            return Err(TransportError::Network("relay unreachable".into()));
        }

        tracing::debug!(method, signed = caller.is_some(), "relay call");

        match method {
            methods::GET_KEYS => self.get_keys(method),
            methods::GET_APPOINTMENTS_BY_ZIP_CODE => {
                self.get_appointments_by_zip_code(method, params)
            }
            methods::GET_APPOINTMENT => self.get_appointment(method, params),
            methods::GET_PROVIDERS_BY_ZIP_CODE => self.get_providers_by_zip_code(method, params),
            methods::STORE_SETTINGS => self.store_settings(method, params),
            methods::GET_SETTINGS => self.get_settings(method, params),
            methods::GET_TOKEN => self.get_token(method, params),
            methods::BOOK_APPOINTMENT => self.book_appointment(method, params),
            methods::CANCEL_BOOKING => self.cancel_booking(method, params),
            methods::STORE_PROVIDER_DATA => self.store_provider_data(method, params, caller),
            methods::CHECK_PROVIDER_DATA => self.check_provider_data(method, caller),
            methods::PUBLISH_APPOINTMENTS => self.publish_appointments(method, params, caller),
            methods::GET_PROVIDER_APPOINTMENTS => {
                self.get_provider_appointments(method, params, caller)
            }
            methods::GET_PENDING_PROVIDER_DATA => {
                self.list_provider_data(method, params, caller, true)
            }
            methods::GET_VERIFIED_PROVIDER_DATA => {
                self.list_provider_data(method, params, caller, false)
            }
            methods::GET_PROVIDER_DATA => self.get_provider_data(method, params, caller),
            methods::CONFIRM_PROVIDER => self.confirm_provider(method, params, caller),
            methods::ADD_MEDIATOR_PUBLIC_KEYS => {
                self.add_mediator_public_keys(method, params, caller)
            }
            methods::RESET_DB => self.reset_db(method, caller),
            _ => Err(TransportError::UnknownMethod(method.to_string())),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Anonymous
    // ─────────────────────────────────────────────────────────────────────────

    fn get_keys(&self, method: &str) -> Result<Value> {
        let state = self.read(method)?;
        respond(
            method,
            &KeyDirectory {
                root_key: self.root_key.clone(),
                token_key: self.token_key.public_key.clone(),
                provider_data: self.provider_data_key.clone(),
                mediators: state.mediators.clone(),
            },
        )
    }

    fn get_appointments_by_zip_code(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            zip_code: String,
            #[serde(default)]
            radius: u32,
            from: i64,
            to: i64,
        }

        let p: Params = parse(method, params)?;
        let zip = parse_zip(&p.zip_code)
            .ok_or_else(|| TransportError::server(method, "invalid zip code"))?;

        let state = self.read(method)?;
        let mut results = Vec::new();
        for (id, public) in &state.public_providers {
            let Some(provider_zip) = public.zip else { continue };
            if provider_zip.abs_diff(zip) > p.radius {
                continue;
            }

            let appointments: Vec<SignedAppointment> = state
                .appointments
                .get(id)
                .into_iter()
                .flat_map(|appointments| appointments.values())
                .filter(|a| a.timestamp >= p.from && a.timestamp <= p.to)
                .map(StoredAppointment::public_view)
                .collect();

            if appointments.is_empty() {
                continue;
            }

            results.push(ProviderAppointments {
                provider: public.entry.provider.clone(),
                key_data: public.entry.key_data.clone(),
                appointments,
            });
        }

        respond(method, &results)
    }

    fn get_appointment(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            id: String,
            #[serde(rename = "providerID")]
            provider_id: String,
        }

        let p: Params = parse(method, params)?;
        let state = self.read(method)?;

        let public = state
            .public_providers
            .get(&p.provider_id)
            .ok_or_else(|| TransportError::server(method, "provider not found"))?;
        let appointment = state
            .appointments
            .get(&p.provider_id)
            .and_then(|appointments| appointments.get(&p.id))
            .ok_or_else(|| TransportError::server(method, "appointment not found"))?;

        respond(
            method,
            &ProviderAppointments {
                provider: public.entry.provider.clone(),
                key_data: public.entry.key_data.clone(),
                appointments: vec![appointment.public_view()],
            },
        )
    }

    fn get_providers_by_zip_code(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            zip_from: String,
            zip_to: String,
        }

        let p: Params = parse(method, params)?;
        let (from, to) = match (parse_zip(&p.zip_from), parse_zip(&p.zip_to)) {
            (Some(from), Some(to)) => (from, to),
            _ => return Err(TransportError::server(method, "invalid zip code range")),
        };

        let state = self.read(method)?;
        let providers: Vec<&PublicProviderEntry> = state
            .public_providers
            .values()
            .filter(|p| p.zip.map_or(false, |zip| zip >= from && zip <= to))
            .map(|p| &p.entry)
            .collect();

        respond(method, &providers)
    }

    fn store_settings(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            id: String,
            data: Value,
        }

        let p: Params = parse(method, params)?;
        self.write(method)?.settings.insert(p.id, p.data);
        Ok(Value::Null)
    }

    fn get_settings(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            id: String,
        }

        let p: Params = parse(method, params)?;
        let state = self.read(method)?;
        Ok(state.settings.get(&p.id).cloned().unwrap_or(Value::Null))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User
    // ─────────────────────────────────────────────────────────────────────────

    fn get_token(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            hash: String,
            #[allow(dead_code)]
            #[serde(default)]
            code: Option<String>,
        }

        let p: Params = parse(method, params)?;
        let token = random_id(ID_LENGTH);
        let signed = SignedData::sign_json(
            &SignedTokenData {
                token: token.clone(),
                hash: p.hash.clone(),
            },
            &self.token_key,
        )
        .map_err(|e| TransportError::server(method, e.to_string()))?;

        self.write(method)?.tokens.insert(token, p.hash);
        respond(method, &signed)
    }

    fn book_appointment(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            id: String,
            #[serde(rename = "providerID")]
            provider_id: String,
            #[serde(rename = "slotID")]
            slot_id: String,
            token: String,
            encrypted_data: EcdhEnvelope,
        }

        let p: Params = parse(method, params)?;
        let mut state = self.write(method)?;

        if !state.tokens.contains_key(&p.token) {
            return Err(TransportError::Unauthorized("unknown token".into()));
        }
        let token_used = state
            .appointments
            .values()
            .flat_map(|appointments| appointments.values())
            .any(|a| a.bookings.iter().any(|b| b.token == p.token));
        if token_used {
            return Err(TransportError::server(method, "token already used"));
        }

        let appointment = state
            .appointments
            .get_mut(&p.provider_id)
            .and_then(|appointments| appointments.get_mut(&p.id))
            .ok_or_else(|| TransportError::server(method, "appointment not found"))?;

        if !appointment.slot_ids.contains(&p.slot_id) {
            return Err(TransportError::server(method, "no such slot"));
        }
        if appointment.bookings.iter().any(|b| b.slot_id == p.slot_id) {
            return Err(TransportError::server(method, "slot already booked"));
        }

        let booking = Booking {
            id: random_id(ID_LENGTH),
            slot_id: p.slot_id,
            token: p.token,
            encrypted_data: p.encrypted_data,
            data: None,
        };
        appointment.bookings.push(booking.clone());

        respond(method, &booking)
    }

    fn cancel_booking(&self, method: &str, params: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            id: String,
            #[serde(rename = "providerID")]
            provider_id: String,
            token: String,
        }

        let p: Params = parse(method, params)?;
        let mut state = self.write(method)?;

        let appointment = state
            .appointments
            .get_mut(&p.provider_id)
            .and_then(|appointments| appointments.get_mut(&p.id))
            .ok_or_else(|| TransportError::server(method, "appointment not found"))?;

        let before = appointment.bookings.len();
        appointment.bookings.retain(|b| b.token != p.token);
        if appointment.bookings.len() == before {
            return Err(TransportError::server(method, "no booking for token"));
        }

        Ok(Value::Null)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Provider
    // ─────────────────────────────────────────────────────────────────────────

    fn store_provider_data(
        &self,
        method: &str,
        params: Value,
        caller: Option<&PublicKey>,
    ) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            encrypted_data: EcdhEnvelope,
            #[allow(dead_code)]
            #[serde(default)]
            code: Option<String>,
        }

        let caller = require_caller(method, caller)?;
        let p: Params = parse(method, params)?;
        let id = provider_id(caller);

        let mut state = self.write(method)?;
        // A re-submission goes back into review but keeps any confirmation.
        let stored = state.providers.entry(id.clone()).or_insert(StoredProvider {
            encrypted_data: p.encrypted_data.clone(),
            pending: true,
            verified: false,
        });
        stored.encrypted_data = p.encrypted_data;
        stored.pending = true;

        Ok(json!({ "id": id }))
    }

    fn check_provider_data(&self, method: &str, caller: Option<&PublicKey>) -> Result<Value> {
        let caller = require_caller(method, caller)?;
        let state = self.read(method)?;
        match state.confirmations.get(&provider_id(caller)) {
            Some(confirmation) => respond(method, confirmation),
            None => Ok(Value::Null),
        }
    }

    fn publish_appointments(
        &self,
        method: &str,
        params: Value,
        caller: Option<&PublicKey>,
    ) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            appointments: Vec<SignedData>,
        }

        let caller = require_caller(method, caller)?;
        let p: Params = parse(method, params)?;
        let id = provider_id(caller);

        let mut state = self.write(method)?;
        if !state.providers.get(&id).map_or(false, |p| p.verified) {
            return Err(TransportError::Unauthorized("provider is not verified".into()));
        }

        let mut parsed = Vec::with_capacity(p.appointments.len());
        for signed in p.appointments {
            let appointment: Appointment = signed
                .open(std::slice::from_ref(caller))
                .map_err(|e| TransportError::server(method, e.to_string()))?;
            if appointment.provider.id != id {
                return Err(TransportError::server(
                    method,
                    "appointment belongs to another provider",
                ));
            }
            parsed.push((appointment, signed));
        }

        let appointments = state.appointments.entry(id).or_default();
        for (appointment, signed) in parsed {
            let slot_ids = appointment.slot_data.iter().map(|s| s.id.clone()).collect();
            match appointments.get_mut(&appointment.id) {
                Some(existing) => {
                    existing.signed = signed;
                    existing.timestamp = appointment.timestamp;
                    existing.slot_ids = slot_ids;
                }
                None => {
                    appointments.insert(
                        appointment.id.clone(),
                        StoredAppointment {
                            signed,
                            timestamp: appointment.timestamp,
                            slot_ids,
                            bookings: Vec::new(),
                        },
                    );
                }
            }
        }

        Ok(Value::Null)
    }

    fn get_provider_appointments(
        &self,
        method: &str,
        params: Value,
        caller: Option<&PublicKey>,
    ) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            from: i64,
            to: i64,
        }

        let caller = require_caller(method, caller)?;
        let p: Params = parse(method, params)?;
        let id = provider_id(caller);

        let state = self.read(method)?;
        if !state.providers.get(&id).map_or(false, |p| p.verified) {
            return Ok(json!([]));
        }

        let appointments: Vec<SignedAppointment> = state
            .appointments
            .get(&id)
            .into_iter()
            .flat_map(|appointments| appointments.values())
            .filter(|a| a.timestamp >= p.from && a.timestamp <= p.to)
            .map(StoredAppointment::owner_view)
            .collect();

        respond(method, &appointments)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mediator
    // ─────────────────────────────────────────────────────────────────────────

    fn require_mediator(
        &self,
        method: &str,
        state: &RelayState,
        caller: Option<&PublicKey>,
    ) -> Result<PublicKey> {
        let caller = require_caller(method, caller)?;
        if !state.mediator_keys.contains(caller) {
            return Err(TransportError::Unauthorized(format!("{} requires a mediator key", method)));
        }
        Ok(caller.clone())
    }

    fn list_provider_data(
        &self,
        method: &str,
        params: Value,
        caller: Option<&PublicKey>,
        pending: bool,
    ) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            #[serde(default)]
            limit: Option<usize>,
        }

        let p: Params = parse(method, params)?;
        let state = self.read(method)?;
        self.require_mediator(method, &state, caller)?;

        let providers: Vec<EncryptedProvider> = state
            .providers
            .iter()
            .filter(|(_, stored)| if pending { stored.pending } else { stored.verified })
            .take(p.limit.unwrap_or(usize::MAX))
            .map(|(id, stored)| EncryptedProvider {
                id: id.clone(),
                encrypted_data: stored.encrypted_data.clone(),
            })
            .collect();

        respond(method, &providers)
    }

    fn get_provider_data(
        &self,
        method: &str,
        params: Value,
        caller: Option<&PublicKey>,
    ) -> Result<Value> {
        #[derive(Deserialize)]
        struct Params {
            id: String,
        }

        let p: Params = parse(method, params)?;
        let state = self.read(method)?;
        self.require_mediator(method, &state, caller)?;

        let stored = state
            .providers
            .get(&p.id)
            .ok_or_else(|| TransportError::server(method, "provider not found"))?;

        respond(
            method,
            &EncryptedProvider {
                id: p.id,
                encrypted_data: stored.encrypted_data.clone(),
            },
        )
    }

    fn confirm_provider(
        &self,
        method: &str,
        params: Value,
        caller: Option<&PublicKey>,
    ) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            confirmed_provider_data: SignedData,
            public_provider_data: SignedData,
            signed_key_data: SignedData,
        }

        let p: Params = parse(method, params)?;
        let mut state = self.write(method)?;
        let mediator = self.require_mediator(method, &state, caller)?;
        let mediator = std::slice::from_ref(&mediator);

        if !p.confirmed_provider_data.verify(mediator) {
            return Err(TransportError::server(method, "invalid confirmation signature"));
        }
        let public: PublicProvider = p
            .public_provider_data
            .open(mediator)
            .map_err(|e| TransportError::server(method, e.to_string()))?;
        let key_data: ProviderKeyData = p
            .signed_key_data
            .open(mediator)
            .map_err(|e| TransportError::server(method, e.to_string()))?;

        if key_data.id != public.id || provider_id(&key_data.signing) != public.id {
            return Err(TransportError::server(method, "key data does not match provider"));
        }
        let stored = state
            .providers
            .get_mut(&public.id)
            .ok_or_else(|| TransportError::server(method, "provider not found"))?;
        stored.pending = false;
        stored.verified = true;

        state
            .confirmations
            .insert(public.id.clone(), p.confirmed_provider_data);
        state.public_providers.insert(
            public.id.clone(),
            StoredPublicProvider {
                zip: parse_zip(&public.zip_code),
                entry: PublicProviderEntry {
                    provider: p.public_provider_data,
                    key_data: p.signed_key_data,
                },
            },
        );

        Ok(Value::Null)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Admin
    // ─────────────────────────────────────────────────────────────────────────

    fn require_root(&self, method: &str, caller: Option<&PublicKey>) -> Result<()> {
        let caller = require_caller(method, caller)?;
        if caller != &self.root_key {
            return Err(TransportError::Unauthorized(format!("{} requires the root key", method)));
        }
        Ok(())
    }

    fn add_mediator_public_keys(
        &self,
        method: &str,
        params: Value,
        caller: Option<&PublicKey>,
    ) -> Result<Value> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Params {
            signed_key_data: SignedData,
        }

        self.require_root(method, caller)?;
        let p: Params = parse(method, params)?;
        let key_data: MediatorKeyData = p
            .signed_key_data
            .open(std::slice::from_ref(&self.root_key))
            .map_err(|e| TransportError::server(method, e.to_string()))?;

        let mut state = self.write(method)?;
        if !state.mediator_keys.contains(&key_data.signing) {
            state.mediator_keys.push(key_data.signing);
            state.mediators.push(p.signed_key_data);
        }

        Ok(Value::Null)
    }

    fn reset_db(&self, method: &str, caller: Option<&PublicKey>) -> Result<Value> {
        self.require_root(method, caller)?;
        let mut state = self.write(method)?;
        let offline = state.offline;
        *state = RelayState {
            offline,
            ..RelayState::default()
        };
        Ok(Value::Null)
    }
}

#[async_trait]
impl Transport for MemoryRelay {
    async fn call(
        &self,
        method: &str,
        params: Value,
        signing_key: Option<&KeyPair>,
    ) -> Result<Value> {
        let (params, caller) = match signing_key {
            Some(key) => {
                let request = SignedData::sign_json(&params, key)
                    .map_err(|e| TransportError::Network(format!("cannot sign request: {}", e)))?;
                authenticate(request)?
            }
            None => (params, None),
        };
        self.dispatch(method, params, caller.as_ref())
    }
}

/// Check a signed request and recover its params and caller.
fn authenticate(request: SignedData) -> Result<(Value, Option<PublicKey>)> {
    let caller = request
        .public_key
        .clone()
        .ok_or_else(|| TransportError::Unauthorized("request carries no public key".into()))?;
    let params = request
        .open(std::slice::from_ref(&caller))
        .map_err(|_| TransportError::Unauthorized("invalid request signature".into()))?;
    Ok((params, Some(caller)))
}

fn require_caller<'a>(method: &str, caller: Option<&'a PublicKey>) -> Result<&'a PublicKey> {
    caller.ok_or_else(|| {
        TransportError::Unauthorized(format!("{} requires a signed request", method))
    })
}

fn parse<P: DeserializeOwned>(method: &str, params: Value) -> Result<P> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params)
        .map_err(|e| TransportError::server(method, format!("invalid params: {}", e)))
}

fn respond<R: Serialize + ?Sized>(method: &str, value: &R) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| TransportError::server(method, e.to_string()))
}

fn parse_zip(zip: &str) -> Option<u32> {
    zip.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanellus_core::MediatorKeyPairs;

    fn relay() -> (AdminKeyPairs, MemoryRelay) {
        let admin = AdminKeyPairs::generate();
        let relay = MemoryRelay::new(&admin);
        (admin, relay)
    }

    #[tokio::test]
    async fn test_get_keys_is_anonymous() {
        let (admin, relay) = relay();
        let keys: KeyDirectory =
            serde_json::from_value(relay.call(methods::GET_KEYS, Value::Null, None).await.unwrap())
                .unwrap();

        assert_eq!(keys.root_key, admin.signing.public_key);
        assert_eq!(keys.token_key, admin.token.public_key);
        assert_eq!(keys.provider_data, admin.provider.public_key);
        assert!(keys.mediators.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let (_, relay) = relay();
        assert!(matches!(
            relay.call("nope", Value::Null, None).await,
            Err(TransportError::UnknownMethod(_))
        ));
    }

    #[tokio::test]
    async fn test_offline() {
        let (_, relay) = relay();
        relay.set_offline(true);
        assert!(matches!(
            relay.call(methods::GET_KEYS, Value::Null, None).await,
            Err(TransportError::Network(_))
        ));

        relay.set_offline(false);
        assert!(relay.call(methods::GET_KEYS, Value::Null, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_provider_methods_need_signature() {
        let (_, relay) = relay();
        assert!(matches!(
            relay.call(methods::CHECK_PROVIDER_DATA, Value::Null, None).await,
            Err(TransportError::Unauthorized(_))
        ));

        let provider = KeyPair::generate_ecdsa();
        let result = relay
            .call(methods::CHECK_PROVIDER_DATA, Value::Null, Some(&provider))
            .await
            .unwrap();
        assert!(result.is_null());
    }

    #[tokio::test]
    async fn test_add_mediator_requires_root() {
        let (admin, relay) = relay();
        let mediator = MediatorKeyPairs::generate(admin.provider.clone());
        let signed = SignedData::sign_json(
            &MediatorKeyData {
                signing: mediator.signing.public_key.clone(),
                encryption: mediator.encryption.public_key.clone(),
            },
            &admin.signing,
        )
        .unwrap();
        let params = json!({ "signedKeyData": signed });

        let impostor = KeyPair::generate_ecdsa();
        assert!(matches!(
            relay
                .call(methods::ADD_MEDIATOR_PUBLIC_KEYS, params.clone(), Some(&impostor))
                .await,
            Err(TransportError::Unauthorized(_))
        ));

        relay
            .call(methods::ADD_MEDIATOR_PUBLIC_KEYS, params, Some(&admin.signing))
            .await
            .unwrap();

        let listed = relay
            .call(
                methods::GET_PENDING_PROVIDER_DATA,
                json!({}),
                Some(&mediator.signing),
            )
            .await
            .unwrap();
        assert_eq!(listed, json!([]));
    }

    async fn enroll_mediator(admin: &AdminKeyPairs, relay: &MemoryRelay) -> MediatorKeyPairs {
        let mediator = MediatorKeyPairs::generate(admin.provider.clone());
        let signed = SignedData::sign_json(
            &MediatorKeyData {
                signing: mediator.signing.public_key.clone(),
                encryption: mediator.encryption.public_key.clone(),
            },
            &admin.signing,
        )
        .unwrap();
        relay
            .call(
                methods::ADD_MEDIATOR_PUBLIC_KEYS,
                json!({ "signedKeyData": signed }),
                Some(&admin.signing),
            )
            .await
            .unwrap();
        mediator
    }

    #[tokio::test]
    async fn test_confirm_rejects_key_data_of_another_provider() {
        let (admin, relay) = relay();
        let mediator = enroll_mediator(&admin, &relay).await;

        let signing = KeyPair::generate_ecdsa();
        let encryption = KeyPair::generate_ecdh();
        let envelope =
            vanellus_core::ecdh_encrypt("{}", &encryption, &admin.provider.public_key).unwrap();
        relay
            .call(
                methods::STORE_PROVIDER_DATA,
                json!({ "encryptedData": envelope, "code": null }),
                Some(&signing),
            )
            .await
            .unwrap();

        let id = provider_id(&signing.public_key);
        let public = PublicProvider {
            id: id.clone(),
            name: "Praxis".into(),
            street: "Hauptstr. 1".into(),
            city: "Berlin".into(),
            zip_code: "10707".into(),
            description: String::new(),
            accessible: true,
        };
        let signed_public = SignedData::sign_json(&public, &mediator.signing).unwrap();
        let params = |key_id: &str| {
            let key_data = ProviderKeyData {
                id: key_id.to_string(),
                signing: signing.public_key.clone(),
                encryption: encryption.public_key.clone(),
                zip_code: "10707".into(),
            };
            json!({
                "confirmedProviderData": signed_public,
                "publicProviderData": signed_public,
                "signedKeyData": SignedData::sign_json(&key_data, &mediator.signing).unwrap(),
            })
        };

        let mismatched = relay
            .call(
                methods::CONFIRM_PROVIDER,
                params("another-provider"),
                Some(&mediator.signing),
            )
            .await;
        assert!(matches!(mismatched, Err(TransportError::Server { .. })));

        relay
            .call(methods::CONFIRM_PROVIDER, params(&id), Some(&mediator.signing))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_mediator_methods_reject_strangers() {
        let (_, relay) = relay();
        let stranger = KeyPair::generate_ecdsa();
        assert!(matches!(
            relay
                .call(methods::GET_PENDING_PROVIDER_DATA, json!({}), Some(&stranger))
                .await,
            Err(TransportError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_store_provider_data_assigns_stable_id() {
        let (admin, relay) = relay();
        let provider = KeyPair::generate_ecdsa();
        let data = KeyPair::generate_ecdh();
        let envelope =
            vanellus_core::ecdh_encrypt("{}", &data, &admin.provider.public_key).unwrap();
        let params = json!({ "encryptedData": envelope, "code": null });

        let first = relay
            .call(methods::STORE_PROVIDER_DATA, params.clone(), Some(&provider))
            .await
            .unwrap();
        let second = relay
            .call(methods::STORE_PROVIDER_DATA, params, Some(&provider))
            .await
            .unwrap();

        assert_eq!(first["id"], second["id"]);
        assert_eq!(first["id"], provider_id(&provider.public_key));
    }

    #[tokio::test]
    async fn test_publish_requires_verification() {
        let (_, relay) = relay();
        let provider = KeyPair::generate_ecdsa();
        assert!(matches!(
            relay
                .call(
                    methods::PUBLISH_APPOINTMENTS,
                    json!({ "appointments": [] }),
                    Some(&provider)
                )
                .await,
            Err(TransportError::Unauthorized(_))
        ));

        let listed = relay
            .call(
                methods::GET_PROVIDER_APPOINTMENTS,
                json!({ "from": 0, "to": i64::MAX }),
                Some(&provider),
            )
            .await
            .unwrap();
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_token_is_signed_with_token_key() {
        let (admin, relay) = relay();
        let signed: SignedData = serde_json::from_value(
            relay
                .call(methods::GET_TOKEN, json!({ "hash": "h", "code": "c" }), None)
                .await
                .unwrap(),
        )
        .unwrap();

        let token: SignedTokenData = signed
            .open(&[admin.token.public_key.clone()])
            .unwrap();
        assert_eq!(token.hash, "h");
        assert!(!signed.verify(&[admin.signing.public_key]));
    }

    #[tokio::test]
    async fn test_settings_roundtrip() {
        let (_, relay) = relay();
        relay
            .call(
                methods::STORE_SETTINGS,
                json!({ "id": "abc", "data": { "x": 1 } }),
                None,
            )
            .await
            .unwrap();

        let stored = relay
            .call(methods::GET_SETTINGS, json!({ "id": "abc" }), None)
            .await
            .unwrap();
        assert_eq!(stored, json!({ "x": 1 }));

        let missing = relay
            .call(methods::GET_SETTINGS, json!({ "id": "nope" }), None)
            .await
            .unwrap();
        assert!(missing.is_null());
    }

    #[tokio::test]
    async fn test_reset_db() {
        let (admin, relay) = relay();
        relay
            .call(methods::STORE_SETTINGS, json!({ "id": "a", "data": 1 }), None)
            .await
            .unwrap();

        assert!(relay.call(methods::RESET_DB, Value::Null, None).await.is_err());
        relay
            .call(methods::RESET_DB, Value::Null, Some(&admin.signing))
            .await
            .unwrap();

        let stored = relay
            .call(methods::GET_SETTINGS, json!({ "id": "a" }), None)
            .await
            .unwrap();
        assert!(stored.is_null());
    }
}
