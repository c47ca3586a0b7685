//! A relay that rewrites its own responses.
//!
//! [`TamperingRelay`] forwards every call to a [`MemoryRelay`] and then hands
//! the response to a hook, which may change it in place. Clients built on it
//! see what a malicious or broken relay would send them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use vanellus_core::{codec, KeyPair, SignedData};
use vanellus_transport::{MemoryRelay, Result, Transport};

type Hook = Box<dyn Fn(&str, &mut Value) + Send + Sync>;

/// A [`MemoryRelay`] behind a response rewriting hook.
pub struct TamperingRelay {
    inner: Arc<MemoryRelay>,
    hook: Hook,
}

impl TamperingRelay {
    /// Run `hook` on every response.
    pub fn new(
        inner: Arc<MemoryRelay>,
        hook: impl Fn(&str, &mut Value) + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner,
            hook: Box::new(hook),
        }
    }

    /// Run `rewrite` on responses to `method` only.
    pub fn on(
        inner: Arc<MemoryRelay>,
        method: &'static str,
        rewrite: impl Fn(&mut Value) + Send + Sync + 'static,
    ) -> Self {
        Self::new(inner, move |called, response| {
            if called == method {
                rewrite(response);
            }
        })
    }
}

#[async_trait]
impl Transport for TamperingRelay {
    async fn call(
        &self,
        method: &str,
        params: Value,
        signing_key: Option<&KeyPair>,
    ) -> Result<Value> {
        let mut response = self.inner.call(method, params, signing_key).await?;
        (self.hook)(method, &mut response);
        Ok(response)
    }
}

/// Flip the first byte of a base64 field such as a signature or ciphertext.
///
/// Panics if `field` is not a base64 string.
pub fn flip_base64(field: &mut Value) {
    let encoded = field.as_str().expect("base64 field");
    let mut bytes = codec::from_base64(encoded).expect("valid base64");
    bytes[0] ^= 0x01;
    *field = Value::String(codec::to_base64(&bytes));
}

/// Open the payload of a signed value without checking the signature.
pub fn signed_payload<T: DeserializeOwned>(signed: &Value) -> T {
    let signed: SignedData = serde_json::from_value(signed.clone()).expect("signed data");
    serde_json::from_str(&signed.data).expect("signed payload")
}

/// Sign `value` with `key` and return it as JSON.
pub fn resign<T: Serialize>(value: &T, key: &KeyPair) -> Value {
    let signed = SignedData::sign_json(value, key).expect("signing");
    serde_json::to_value(signed).expect("signed data to JSON")
}
