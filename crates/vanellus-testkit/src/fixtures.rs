//! Test fixtures and helpers.
//!
//! A [`TestContext`] wires every role client to one in-memory relay with an
//! enrolled mediator, so scenarios can start from any point of the provider
//! lifecycle.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use rand::Rng;

use vanellus::{AdminClient, AnonymousClient, MediatorClient, ProviderClient, UserClient};
use vanellus_core::{
    now_millis, AdminKeyPairs, Appointment, MediatorKeyPairs, Provider, ProviderInput,
    ProviderKeyPairs,
};
use vanellus_transport::MemoryRelay;

/// One day in milliseconds.
pub const DAY: i64 = 86_400_000;

/// One hour in milliseconds.
pub const HOUR: i64 = 3_600_000;

/// A relay, an admin, one enrolled mediator and a client per role.
pub struct TestContext {
    pub relay: Arc<MemoryRelay>,
    pub admin_keys: AdminKeyPairs,
    pub mediator_keys: MediatorKeyPairs,
    pub admin: AdminClient<MemoryRelay>,
    pub anonymous: AnonymousClient<MemoryRelay>,
    pub mediator: MediatorClient<MemoryRelay>,
    pub provider: ProviderClient<MemoryRelay>,
    pub user: UserClient<MemoryRelay>,
}

/// A provider's keys and the record the relay assigned it.
#[derive(Debug, Clone)]
pub struct TestProvider {
    pub keys: ProviderKeyPairs,
    pub provider: Provider,
}

impl TestContext {
    /// Fresh relay with one mediator enrolled by the root key.
    pub async fn new() -> anyhow::Result<Self> {
        let admin_keys = AdminKeyPairs::generate();
        let relay = Arc::new(MemoryRelay::new(&admin_keys));

        let admin = AdminClient::new(relay.clone());
        let mediator_keys = admin
            .add_mediator(&admin_keys)
            .await
            .context("enrolling mediator")?;

        Ok(Self {
            anonymous: AnonymousClient::new(relay.clone()),
            mediator: MediatorClient::new(relay.clone()),
            provider: ProviderClient::new(relay.clone()),
            user: UserClient::new(relay.clone()),
            admin,
            admin_keys,
            mediator_keys,
            relay,
        })
    }

    /// Submit a provider without confirming it.
    pub async fn create_unverified_provider(
        &self,
        input: ProviderInput,
    ) -> anyhow::Result<TestProvider> {
        let keys = self.provider.generate_key_pairs();
        let provider = self
            .provider
            .store_provider(input, &keys, None)
            .await
            .context("storing provider")?;
        Ok(TestProvider { keys, provider })
    }

    /// Submit a provider and confirm it through the mediator's pending list.
    pub async fn create_verified_provider(
        &self,
        input: ProviderInput,
    ) -> anyhow::Result<TestProvider> {
        let submitted = self.create_unverified_provider(input).await?;
        self.confirm(&submitted).await?;

        let provider = self
            .provider
            .check_provider(&submitted.keys)
            .await?
            .ok_or_else(|| anyhow!("provider still unconfirmed after confirmation"))?;
        Ok(TestProvider {
            keys: submitted.keys,
            provider,
        })
    }

    /// Confirm a submitted provider the way a mediator would: find it in the
    /// pending list, decrypt it, confirm it.
    pub async fn confirm(&self, submitted: &TestProvider) -> anyhow::Result<Provider> {
        let pending = self
            .mediator
            .get_pending_providers(None, &self.mediator_keys)
            .await?;
        let provider = pending
            .providers
            .into_iter()
            .find(|p| p.id == submitted.provider.id)
            .ok_or_else(|| anyhow!("submission {} not pending", submitted.provider.id))?;

        self.mediator
            .confirm_provider(&provider, &self.mediator_keys)
            .await?;
        Ok(provider)
    }

    /// `count` local appointments for `provider`, one hour apart from `start`.
    pub fn create_appointments(
        &self,
        provider: &TestProvider,
        count: usize,
        slot_count: usize,
        start: i64,
    ) -> anyhow::Result<Vec<Appointment>> {
        let public = provider.provider.public();
        (0..count)
            .map(|i| {
                let timestamp = start + i as i64 * HOUR;
                let keys = &provider.keys;
                self.provider
                    .create_appointment(15, "biontech", slot_count, timestamp, &public, keys)
                    .map_err(anyhow::Error::from)
            })
            .collect()
    }

    /// Like [`create_appointments`](Self::create_appointments), then publish.
    pub async fn publish_appointments(
        &self,
        provider: &TestProvider,
        count: usize,
        slot_count: usize,
        start: i64,
    ) -> anyhow::Result<Vec<Appointment>> {
        let appointments = self.create_appointments(provider, count, slot_count, start)?;
        let published = self
            .provider
            .publish_appointments(&appointments, &provider.keys)
            .await?;
        Ok(published)
    }
}

/// A provider in zip 10707.
pub fn default_provider_input() -> ProviderInput {
    ProviderInput {
        name: "Praxis am Kurfürstendamm".into(),
        street: "Kurfürstendamm 100".into(),
        city: "Berlin".into(),
        zip_code: "10707".into(),
        description: "Impfungen nach Vereinbarung".into(),
        email: "praxis@example.org".into(),
        accessible: true,
    }
}

/// The default provider moved to `zip_code`.
pub fn provider_input_at(zip_code: &str) -> ProviderInput {
    ProviderInput {
        zip_code: zip_code.into(),
        ..default_provider_input()
    }
}

/// A random five-digit zip code.
pub fn random_zip_code() -> String {
    format!("{:05}", rand::thread_rng().gen_range(10_000..100_000))
}

/// Midnight (UTC) of the day after today, in Unix ms.
pub fn tomorrow() -> i64 {
    (now_millis() / DAY + 1) * DAY
}

/// `hour:00` tomorrow, in Unix ms.
pub fn tomorrow_at(hour: i64) -> i64 {
    tomorrow() + hour * HOUR
}
