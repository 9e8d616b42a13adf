use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{RP_ID, USER_ID_SALT};

/// A public-key credential as known to the relying party: the authenticator's
/// public half plus bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    /// Authenticator-assigned identifier, base64url. Immutable after creation.
    pub credential_id: String,
    /// Raw COSE public key bytes, base64url. Owned exclusively by this credential.
    pub public_key: String,
    /// Authenticator signature counter as of the last successful assertion.
    pub sign_count: u32,
    /// Advisory transport hints reported at registration.
    pub transports: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(
        credential_id: String,
        public_key: String,
        sign_count: u32,
        transports: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            credential_id,
            public_key,
            sign_count,
            transports,
            created_at: now,
            last_used_at: now,
        }
    }
}

/// A user identity: stable derived id, normalized username, and registered
/// credentials in registration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    /// Deterministic identifier derived from the normalized username.
    pub id: String,
    /// Username normalized to carry a domain suffix.
    pub username: String,
    /// Registered credentials; insertion order is registration order.
    pub credentials: Vec<Credential>,
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn new(id: String, username: String) -> Self {
        Self {
            id,
            username,
            credentials: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Find a registered credential by its base64url identifier.
    pub fn credential(&self, credential_id: &str) -> Option<&Credential> {
        self.credentials
            .iter()
            .find(|c| c.credential_id == credential_id)
    }
}

/// Append the RP domain when the username carries no domain separator.
/// Idempotent: an already-qualified name passes through unchanged.
pub fn normalize_username(raw: &str) -> String {
    if raw.contains('@') {
        raw.to_string()
    } else {
        format!("{raw}@{}", RP_ID.as_str())
    }
}

/// Derive the stable user identifier: hex SHA-256 over a fixed salt and the
/// normalized username, truncated to 32 characters.
pub fn derive_user_id(normalized_username: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(USER_ID_SALT.as_bytes());
    hasher.update(normalized_username.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..32].to_string()
}
