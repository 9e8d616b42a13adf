use thiserror::Error;

use crate::utils::UtilError;

/// Reasons a registration or authentication response fails verification.
///
/// The ceremony layer treats every variant uniformly as a verification
/// failure; the variants exist so logs and rejection messages can name the
/// failing check.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Challenge in the client data does not match the issued challenge
    #[error("Invalid challenge: {0}")]
    Challenge(String),

    /// Client data JSON failed a type or origin check
    #[error("Invalid client data: {0}")]
    ClientData(String),

    /// Authenticator data failed a structural or flag check
    #[error("Invalid authenticator data: {0}")]
    AuthenticatorData(String),

    /// Response payload is structurally malformed
    #[error("Invalid format: {0}")]
    Format(String),

    /// Cryptographic verification failed
    #[error("Verification error: {0}")]
    Verification(String),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
