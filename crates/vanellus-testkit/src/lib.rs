//! # Vanellus Testkit
//!
//! Testing utilities for the Vanellus SDK.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a [`TestContext`] with a relay, an enrolled mediator and
//!   one client per role, plus helpers for verified providers and appointments
//! - **Generators**: proptest strategies for provider data, contact data and
//!   payloads
//! - **Tampering**: a [`TamperingRelay`] that rewrites relay responses, for
//!   checking that clients reject what they cannot verify
//!
//! The end-to-end scenarios live in this crate's `tests/` directory.
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use vanellus_testkit::fixtures::{default_provider_input, tomorrow_at, TestContext};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let ctx = TestContext::new().await?;
//!     let provider = ctx.create_verified_provider(default_provider_input()).await?;
//!     let published = ctx.publish_appointments(&provider, 3, 5, tomorrow_at(9)).await?;
//!     assert_eq!(published.len(), 3);
//!     Ok(())
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vanellus_testkit::generators::ProviderParams;
//!
//! proptest! {
//!     #[test]
//!     fn zip_is_five_digits(params: ProviderParams) {
//!         prop_assert_eq!(params.input.zip_code.len(), 5);
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod tamper;

pub use fixtures::{default_provider_input, provider_input_at, TestContext, TestProvider};
pub use generators::ProviderParams;
pub use tamper::TamperingRelay;
