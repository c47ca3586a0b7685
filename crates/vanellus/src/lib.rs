//! # Vanellus
//!
//! Client SDK for privacy-preserving appointment booking.
//!
//! ## Overview
//!
//! Four roles meet through a relay that never sees plaintext:
//!
//! - **Admin**: holds the root keys and enrolls mediators
//! - **Mediator**: reviews provider submissions and confirms providers
//! - **Provider**: publishes signed appointments and reads encrypted bookings
//! - **User**: discovers appointments anonymously and books with a token
//!
//! Each role has a client. [`ProviderClient`], [`MediatorClient`] and
//! [`UserClient`] wrap an [`AnonymousClient`] for the calls anyone may make;
//! [`AdminClient`] stands alone.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vanellus::{AdminClient, MediatorClient, ProviderClient};
//! use vanellus_core::{AdminKeyPairs, ProviderInput};
//! use vanellus_transport::MemoryRelay;
//!
//! async fn example() -> vanellus::Result<()> {
//!     let admin_keys = AdminKeyPairs::generate();
//!     let relay = Arc::new(MemoryRelay::new(&admin_keys));
//!
//!     let mediator_keys = AdminClient::new(relay.clone()).add_mediator(&admin_keys).await?;
//!
//!     let provider = ProviderClient::new(relay.clone());
//!     let keys = provider.generate_key_pairs();
//!     let submitted = provider.store_provider(ProviderInput::default(), &keys, None).await?;
//!
//!     let mediator = MediatorClient::new(relay);
//!     mediator.confirm_provider(&submitted, &mediator_keys).await?;
//!
//!     assert!(provider.check_provider(&keys).await?.is_some());
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod anonymous;
pub mod cache;
pub mod config;
pub mod error;
pub mod mediator;
pub mod provider;
pub mod user;

pub use admin::AdminClient;
pub use anonymous::AnonymousClient;
pub use cache::SealedCache;
pub use config::ClientConfig;
pub use error::{Result, VanellusError};
pub use mediator::{FailedSubmission, MediatorClient, ProviderListing};
pub use provider::{ProviderBackup, ProviderClient, ProviderStatus, MAX_SERIES_LENGTH};
pub use user::{UserBackup, UserClient};
