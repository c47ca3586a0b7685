//! Role key pairs.
//!
//! Each role owns a fixed bundle of keys. Which curve operation a pair is
//! used for is fixed by the field it sits in.

use serde::{Deserialize, Serialize};

use crate::crypto::{KeyPair, PublicKey, SymmetricKey};

/// Keys held by the root authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminKeyPairs {
    /// Root signing key; signs mediator enrollments.
    pub signing: KeyPair,
    /// Signs user tokens.
    pub token: KeyPair,
    /// ECDH pair providers encrypt their submissions to.
    pub provider: KeyPair,
}

impl AdminKeyPairs {
    pub fn generate() -> Self {
        Self {
            signing: KeyPair::generate_ecdsa(),
            token: KeyPair::generate_ecdsa(),
            provider: KeyPair::generate_ecdh(),
        }
    }
}

/// Keys held by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderKeyPairs {
    /// Signs requests and published appointments.
    pub signing: KeyPair,
    /// ECDH pair for the verification round trip.
    pub data: KeyPair,
    /// ECDH pair users encrypt bookings to.
    pub encryption: KeyPair,
    /// Symmetric key for local state.
    pub sync: SymmetricKey,
}

impl ProviderKeyPairs {
    pub fn generate() -> Self {
        Self {
            signing: KeyPair::generate_ecdsa(),
            data: KeyPair::generate_ecdh(),
            encryption: KeyPair::generate_ecdh(),
            sync: SymmetricKey::generate(),
        }
    }

    /// The public halves submitted alongside provider data.
    pub fn public_keys(&self) -> ProviderPublicKeys {
        ProviderPublicKeys {
            data: self.data.public_key.clone(),
            signing: self.signing.public_key.clone(),
            encryption: self.encryption.public_key.clone(),
        }
    }
}

/// Public halves of a provider's asymmetric keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderPublicKeys {
    pub data: PublicKey,
    pub signing: PublicKey,
    pub encryption: PublicKey,
}

/// Keys held by a mediator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediatorKeyPairs {
    pub signing: KeyPair,
    pub encryption: KeyPair,
    /// Copy of the admin `provider` pair, for reading submissions.
    pub provider: KeyPair,
}

impl MediatorKeyPairs {
    /// Fresh signing and encryption pairs plus the entrusted provider pair.
    pub fn generate(provider: KeyPair) -> Self {
        Self {
            signing: KeyPair::generate_ecdsa(),
            encryption: KeyPair::generate_ecdh(),
            provider,
        }
    }
}
