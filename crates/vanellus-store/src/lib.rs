//! # Vanellus Store
//!
//! Local state storage for Vanellus clients. Provides a trait-based
//! key/value interface with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`SettingsStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vanellus_store::{SettingsStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("vanellus.db").unwrap();
//!     store.set("provider/keys", b"...").await.unwrap();
//!     let value = store.get("provider/keys").await.unwrap();
//! }
//! ```
//!
//! Values are opaque to the store; the client seals sensitive state before
//! writing it.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::SettingsStore;
