use ring::digest;

use super::attestation::{AttestationObject, parse_attested_credential, verify_attestation};
use super::cose::CosePublicKey;
use super::errors::VerificationError;
use super::types::{AuthenticatorAssertion, AuthenticatorData, ParsedClientData, RegisterCredential};
use crate::utils::{base64url_decode, base64url_encode};

/// Outcome of a verified registration response.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationVerification {
    /// Authenticator-assigned credential id, base64url
    pub credential_id: String,
    /// COSE public key bytes, base64url
    pub public_key: String,
    /// Initial signature counter
    pub sign_count: u32,
}

/// Outcome of a verified authentication response.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticationVerification {
    pub new_sign_count: u32,
}

/// Capability boundary for the cryptographic validation of authenticator
/// responses. The ceremony layer depends only on this trait; every failure is
/// a value, never a panic, and the orchestrator treats all variants uniformly
/// as a verification failure.
pub trait CredentialVerifier: Send + Sync {
    /// Validate a registration response and extract the new credential.
    fn verify_registration(
        &self,
        response: &[u8],
        expected_challenge: &str,
        expected_rp_id: &str,
        expected_origin: &str,
    ) -> Result<RegistrationVerification, VerificationError>;

    /// Validate an authentication assertion against a stored public key.
    #[allow(clippy::too_many_arguments)]
    fn verify_authentication(
        &self,
        response: &[u8],
        expected_challenge: &str,
        expected_rp_id: &str,
        expected_origin: &str,
        credential_public_key: &str,
        current_sign_count: u32,
        require_user_verification: bool,
    ) -> Result<AuthenticationVerification, VerificationError>;
}

/// Default verifier backed by ring and ciborium.
pub struct WebauthnVerifier;

impl CredentialVerifier for WebauthnVerifier {
    fn verify_registration(
        &self,
        response: &[u8],
        expected_challenge: &str,
        expected_rp_id: &str,
        expected_origin: &str,
    ) -> Result<RegistrationVerification, VerificationError> {
        let reg_data: RegisterCredential = serde_json::from_slice(response).map_err(|e| {
            VerificationError::Format(format!("Failed to parse registration response: {e}"))
        })?;

        let client_data = ParsedClientData::from_base64(&reg_data.response.client_data_json)?;
        client_data.verify("webauthn.create", expected_challenge, expected_origin)?;

        let attestation = AttestationObject::from_base64(&reg_data.response.attestation_object)?;
        let auth_data = AuthenticatorData::parse(attestation.auth_data.clone())?;
        auth_data.verify_rp_id_hash(expected_rp_id)?;

        if !auth_data.is_user_present() {
            return Err(VerificationError::AuthenticatorData(
                "User Present flag not set".to_string(),
            ));
        }
        if !auth_data.has_attested_credential_data() {
            return Err(VerificationError::AuthenticatorData(
                "No attested credential data".to_string(),
            ));
        }

        let attested = parse_attested_credential(&attestation.auth_data)?;
        let credential_key = CosePublicKey::from_cbor(&attested.cose_key)?;

        let client_data_hash = digest::digest(&digest::SHA256, &client_data.raw_data);
        verify_attestation(&attestation, client_data_hash.as_ref(), &credential_key)?;

        tracing::debug!(
            "Registration verified: credential id {} bytes, alg {}",
            attested.credential_id.len(),
            credential_key.algorithm()
        );

        Ok(RegistrationVerification {
            credential_id: base64url_encode(attested.credential_id),
            public_key: base64url_encode(attested.cose_key_bytes),
            sign_count: auth_data.counter,
        })
    }

    fn verify_authentication(
        &self,
        response: &[u8],
        expected_challenge: &str,
        expected_rp_id: &str,
        expected_origin: &str,
        credential_public_key: &str,
        current_sign_count: u32,
        require_user_verification: bool,
    ) -> Result<AuthenticationVerification, VerificationError> {
        let assertion: AuthenticatorAssertion = serde_json::from_slice(response).map_err(|e| {
            VerificationError::Format(format!("Failed to parse authentication response: {e}"))
        })?;

        let client_data = ParsedClientData::from_base64(&assertion.response.client_data_json)?;
        client_data.verify("webauthn.get", expected_challenge, expected_origin)?;

        let auth_data = AuthenticatorData::from_base64(&assertion.response.authenticator_data)?;
        auth_data.verify_rp_id_hash(expected_rp_id)?;

        if !auth_data.is_user_present() {
            return Err(VerificationError::AuthenticatorData(
                "User not present".to_string(),
            ));
        }
        if require_user_verification && !auth_data.is_user_verified() {
            return Err(VerificationError::AuthenticatorData(format!(
                "User verification required but flag not set. Flags: {:02x}",
                auth_data.flags
            )));
        }

        let key_bytes = base64url_decode(credential_public_key)
            .map_err(|e| VerificationError::Format(format!("Invalid public key: {e}")))?;
        let credential_key = CosePublicKey::parse(&key_bytes)?;

        let sig = base64url_decode(&assertion.response.signature)
            .map_err(|e| VerificationError::Format(format!("Invalid signature: {e}")))?;

        let client_data_hash = digest::digest(&digest::SHA256, &client_data.raw_data);
        let mut signed_data =
            Vec::with_capacity(auth_data.raw_data.len() + client_data_hash.as_ref().len());
        signed_data.extend_from_slice(&auth_data.raw_data);
        signed_data.extend_from_slice(client_data_hash.as_ref());

        credential_key.verify_signature(&signed_data, &sig)?;

        // A counter of 0 means the authenticator doesn't support counters.
        // A non-increasing counter can indicate a cloned authenticator; the
        // baseline policy accepts it and only records the observation.
        if auth_data.counter != 0 && auth_data.counter <= current_sign_count {
            tracing::warn!(
                "Sign count did not increase (stored: {}, received: {}) - possible credential cloning",
                current_sign_count,
                auth_data.counter
            );
        }

        tracing::debug!("Signature verification successful");

        Ok(AuthenticationVerification {
            new_sign_count: auth_data.counter,
        })
    }
}
