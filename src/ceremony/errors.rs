use serde_json::{Value, json};
use thiserror::Error;

use super::challenge::CeremonyKind;
use crate::session::SessionError;
use crate::userdb::UserError;
use crate::utils::UtilError;
use crate::webauthn::VerificationError;

/// Failures a ceremony step can resolve to. Policy rejections carry their own
/// variants; verification failures wrap the verifier's reason; everything else
/// is an integrity problem with the ceremony state.
#[derive(Debug, Error)]
pub enum CeremonyError {
    /// Registration is first-write-wins; the username is taken
    #[error("User already exists")]
    DuplicateUser,

    /// Authentication never creates a user
    #[error("User not found")]
    UserNotFound,

    /// The response references a credential the subject never registered
    #[error("Credential not found")]
    CredentialNotFound,

    /// Finish called with no outstanding challenge of the matching kind
    #[error("No active {0} ceremony")]
    NoActiveCeremony(CeremonyKind),

    /// Cryptographic or protocol mismatch reported by the verifier
    #[error("{0}")]
    Verification(#[from] VerificationError),

    /// Ceremony state and directory state disagree
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("User error: {0}")]
    User(UserError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl From<UserError> for CeremonyError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::AlreadyExists => Self::DuplicateUser,
            UserError::NotFound => Self::UserNotFound,
            other => Self::User(other),
        }
    }
}

impl CeremonyError {
    /// HTTP-ish status the transport layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            Self::DuplicateUser => 406,
            Self::UserNotFound => 404,
            Self::CredentialNotFound
            | Self::NoActiveCeremony(_)
            | Self::Verification(_)
            | Self::Utils(_) => 400,
            Self::InvalidState(_) | Self::User(_) | Self::Session(_) => 500,
        }
    }

    /// The `{verified, msg, status}` body for a failed finish step.
    pub fn rejection(&self) -> Value {
        json!({
            "verified": false,
            "msg": self.to_string(),
            "status": self.status(),
        })
    }
}
