//! Transport abstraction.
//!
//! A transport delivers one method call to the relay and returns its JSON
//! result. Implementations may use JSON-RPC over HTTP or anything else.
//! Payload signing and encryption happen before the call; the transport only
//! authenticates the request itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use vanellus_core::KeyPair;

use crate::error::Result;

/// Transport trait for relay calls.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Call `method` with `params`.
    ///
    /// With a `signing_key` the request is signed so the relay can identify
    /// the caller; without one the call is anonymous.
    async fn call(
        &self,
        method: &str,
        params: Value,
        signing_key: Option<&KeyPair>,
    ) -> Result<Value>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn call(
        &self,
        method: &str,
        params: Value,
        signing_key: Option<&KeyPair>,
    ) -> Result<Value> {
        (**self).call(method, params, signing_key).await
    }
}
