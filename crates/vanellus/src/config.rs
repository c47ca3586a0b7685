//! Client configuration.

use vanellus_core::{PublicKey, DEFAULT_SECRET_LENGTH};

/// Configuration shared by all role clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Pinned root key. A key directory naming a different root is rejected.
    pub root_key: Option<PublicKey>,
    /// Fail discovery on the first unverifiable item instead of skipping it.
    pub strict_discovery: bool,
    /// Default limit for mediator provider listings.
    pub list_limit: Option<usize>,
    /// Random bytes in generated secrets.
    pub secret_length: usize,
    /// Random bytes in generated slot ids.
    pub slot_id_length: usize,
    /// Version tag written into user tokens.
    pub token_version: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            root_key: None,
            strict_discovery: false,
            list_limit: None,
            secret_length: DEFAULT_SECRET_LENGTH,
            slot_id_length: 32,
            token_version: "0.3".to_string(),
        }
    }
}

impl ClientConfig {
    /// Pin the root key.
    pub fn with_root_key(mut self, root_key: PublicKey) -> Self {
        self.root_key = Some(root_key);
        self
    }

    /// Turn on strict discovery.
    pub fn strict(mut self) -> Self {
        self.strict_discovery = true;
        self
    }
}
