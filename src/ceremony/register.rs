use super::challenge::{self, CeremonyKind};
use super::errors::CeremonyError;
use super::types::{
    AuthenticatorSelection, CredentialDescriptor, FinishResult, PubKeyCredParam,
    PublicKeyCredentialUserEntity, RegistrationOptions, RelyingParty,
};
use crate::config::{ATTESTATION, CEREMONY_TIMEOUT, ORIGIN, PUB_KEY_ALGS, RP_ID, RP_NAME,
    USER_VERIFICATION};
use crate::userdb::{self, Credential, UserError};
use crate::webauthn::{CredentialVerifier, WebauthnVerifier};

/// Begin a registration ceremony: create the account (first-write-wins),
/// issue a challenge bound to it, and produce creation options.
pub async fn start_registration(username: &str) -> Result<RegistrationOptions, CeremonyError> {
    let account = userdb::create_account(username).await?;

    let challenge = challenge::issue(CeremonyKind::Registration, &account.id).await?;

    let options = RegistrationOptions {
        challenge: challenge.value,
        rp: RelyingParty {
            id: RP_ID.to_string(),
            name: RP_NAME.to_string(),
        },
        user: PublicKeyCredentialUserEntity {
            id: account.id.clone(),
            name: account.username.clone(),
            display_name: account.username.clone(),
        },
        pub_key_cred_params: PUB_KEY_ALGS
            .iter()
            .map(|&alg| PubKeyCredParam {
                type_: "public-key".to_string(),
                alg,
            })
            .collect(),
        // Empty for a brand-new account; kept for parity with re-registration
        exclude_credentials: account
            .credentials
            .iter()
            .map(CredentialDescriptor::from)
            .collect(),
        authenticator_selection: AuthenticatorSelection {
            user_verification: USER_VERIFICATION.to_string(),
        },
        timeout: *CEREMONY_TIMEOUT * 1000,
        attestation: ATTESTATION.to_string(),
    };

    tracing::debug!("Registration options: {:?}", options);

    Ok(options)
}

/// Finish a registration ceremony with the default verifier.
pub async fn finish_registration(body: &[u8]) -> Result<FinishResult, CeremonyError> {
    finish_registration_with(&WebauthnVerifier, body).await
}

/// Finish a registration ceremony, delegating cryptographic validation to
/// `verifier`. The challenge is consumed before verification, so a failed
/// attempt cannot be replayed against the same challenge.
pub async fn finish_registration_with(
    verifier: &dyn CredentialVerifier,
    body: &[u8],
) -> Result<FinishResult, CeremonyError> {
    let challenge = challenge::consume(CeremonyKind::Registration)
        .await
        .ok_or(CeremonyError::NoActiveCeremony(CeremonyKind::Registration))?;

    let verification = verifier
        .verify_registration(body, &challenge.value, &RP_ID, &ORIGIN)
        .map_err(|e| {
            tracing::error!("Registration verification failed: {}", e);
            CeremonyError::Verification(e)
        })?;

    let transports = transports_from_payload(body);
    let credential = Credential::new(
        verification.credential_id,
        verification.public_key,
        verification.sign_count,
        transports,
    );

    userdb::append_credential(&challenge.user_id, credential)
        .await
        .map_err(|e| match e {
            UserError::NotFound => {
                CeremonyError::InvalidState("Active subject missing from directory".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!("Credential registered for user {}", challenge.user_id);

    Ok(FinishResult { verified: true })
}

/// Advisory transport hints from the raw payload's top level; absent or
/// malformed hints degrade to empty.
fn transports_from_payload(body: &[u8]) -> Vec<String> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("transports").cloned())
        .and_then(|t| serde_json::from_value(t).ok())
        .unwrap_or_default()
}
