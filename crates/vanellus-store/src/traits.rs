//! SettingsStore trait: the abstract interface for local client state.
//!
//! Values are opaque bytes. Callers that keep anything sensitive seal it
//! before it reaches the store.

use async_trait::async_trait;

use crate::error::Result;

/// Async key/value store for local client state.
///
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Get the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List keys starting with `prefix`, in ascending order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}
