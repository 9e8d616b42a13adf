use serde::Deserialize;

use super::challenge::{self, CeremonyKind};
use super::errors::CeremonyError;
use super::types::{AuthenticationOptions, CredentialDescriptor};
use crate::config::{AUTH_REQUIRE_USER_VERIFICATION, CEREMONY_TIMEOUT, ORIGIN, RP_ID,
    USER_VERIFICATION};
use crate::session::{self, SessionGrant};
use crate::userdb;
use crate::webauthn::{CredentialVerifier, VerificationError, WebauthnVerifier};

/// Begin an authentication ceremony: look up the account (never creating
/// one), issue a challenge bound to it, and produce request options listing
/// the subject's registered credentials.
pub async fn start_authentication(username: &str) -> Result<AuthenticationOptions, CeremonyError> {
    let account = userdb::lookup_account(username)
        .await?
        .ok_or(CeremonyError::UserNotFound)?;

    tracing::debug!("Looking up user {} - found ({})", account.username, account.id);

    let challenge = challenge::issue(CeremonyKind::Authentication, &account.id).await?;

    let options = AuthenticationOptions {
        challenge: challenge.value,
        timeout: *CEREMONY_TIMEOUT * 1000,
        rp_id: RP_ID.to_string(),
        allow_credentials: account
            .credentials
            .iter()
            .map(CredentialDescriptor::from)
            .collect(),
        user_verification: USER_VERIFICATION.to_string(),
    };

    tracing::debug!("Authentication options: {:?}", options);

    Ok(options)
}

/// Finish an authentication ceremony with the default verifier.
pub async fn finish_authentication(body: &[u8]) -> Result<SessionGrant, CeremonyError> {
    finish_authentication_with(&WebauthnVerifier, body).await
}

/// Finish an authentication ceremony, delegating cryptographic validation to
/// `verifier`. On success the matched credential's sign count is overwritten
/// with the verifier's value and a session is established for the subject.
pub async fn finish_authentication_with(
    verifier: &dyn CredentialVerifier,
    body: &[u8],
) -> Result<SessionGrant, CeremonyError> {
    let challenge = challenge::consume(CeremonyKind::Authentication)
        .await
        .ok_or(CeremonyError::NoActiveCeremony(CeremonyKind::Authentication))?;

    let account = userdb::get_account(&challenge.user_id)
        .await?
        .ok_or_else(|| {
            CeremonyError::InvalidState("Active subject missing from directory".to_string())
        })?;

    let credential_id = referenced_credential_id(body)?;
    let credential = account
        .credential(&credential_id)
        .ok_or(CeremonyError::CredentialNotFound)?;

    let verification = verifier
        .verify_authentication(
            body,
            &challenge.value,
            &RP_ID,
            &ORIGIN,
            &credential.public_key,
            credential.sign_count,
            *AUTH_REQUIRE_USER_VERIFICATION,
        )
        .map_err(|e| {
            tracing::error!("Authentication verification failed: {}", e);
            CeremonyError::Verification(e)
        })?;

    // Overwrite with whatever the authenticator reported; a non-increasing
    // value was already warn-logged by the verifier.
    userdb::update_sign_count(&account.id, &credential_id, verification.new_sign_count)
        .await
        .map_err(|e| CeremonyError::InvalidState(e.to_string()))?;

    let grant = session::new_session(&account.id, &account.username).await?;

    tracing::info!("User {} authenticated", account.username);

    Ok(grant)
}

#[derive(Deserialize)]
struct CredentialRef {
    id: String,
}

/// The credential id the assertion claims to answer with.
fn referenced_credential_id(body: &[u8]) -> Result<String, CeremonyError> {
    let parsed: CredentialRef = serde_json::from_slice(body).map_err(|e| {
        CeremonyError::Verification(VerificationError::Format(format!(
            "Failed to parse authentication response: {e}"
        )))
    })?;
    Ok(parsed.id)
}
