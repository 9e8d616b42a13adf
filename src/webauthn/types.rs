use ring::digest;
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::errors::VerificationError;
use crate::utils::base64url_decode;

/// Credential data received from the browser after navigator.credentials.create().
#[allow(unused)]
#[derive(Deserialize, Debug)]
pub struct RegisterCredential {
    pub(crate) id: String,
    #[serde(rename = "rawId")]
    pub(crate) raw_id: String,
    pub(crate) response: AuthenticatorAttestationResponse,
    #[serde(rename = "type")]
    pub(crate) type_: String,
    /// Advisory transport hints; absent in older client payloads.
    #[serde(default)]
    pub(crate) transports: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub(crate) client_data_json: String,
    #[serde(rename = "attestationObject")]
    pub(crate) attestation_object: String,
}

/// Assertion received from the browser after navigator.credentials.get().
#[allow(unused)]
#[derive(Deserialize, Debug)]
pub struct AuthenticatorAssertion {
    pub(crate) id: String,
    #[serde(rename = "rawId")]
    pub(crate) raw_id: String,
    pub(crate) response: AuthenticatorAssertionResponse,
    #[serde(rename = "type")]
    pub(crate) type_: String,
}

#[allow(unused)]
#[derive(Deserialize, Debug)]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub(crate) client_data_json: String,
    #[serde(rename = "authenticatorData")]
    pub(crate) authenticator_data: String,
    pub(crate) signature: String,
    #[serde(rename = "userHandle")]
    pub(crate) user_handle: Option<String>,
}

#[derive(Debug)]
pub(crate) struct ParsedClientData {
    pub(crate) challenge: String,
    pub(crate) origin: String,
    pub(crate) type_: String,
    pub(crate) raw_data: Vec<u8>,
}

impl ParsedClientData {
    pub(crate) fn from_base64(client_data_json: &str) -> Result<Self, VerificationError> {
        let raw_data = base64url_decode(client_data_json)
            .map_err(|e| VerificationError::Format(format!("Failed to decode: {e}")))?;

        let data_str = String::from_utf8(raw_data.clone())
            .map_err(|e| VerificationError::Format(format!("Invalid UTF-8: {e}")))?;

        let data: serde_json::Value = serde_json::from_str(&data_str)
            .map_err(|e| VerificationError::Format(format!("Invalid JSON: {e}")))?;

        let challenge = data["challenge"]
            .as_str()
            .ok_or_else(|| VerificationError::ClientData("Missing challenge".into()))?
            .to_string();

        Ok(Self {
            challenge,
            origin: data["origin"]
                .as_str()
                .ok_or_else(|| VerificationError::ClientData("Missing origin".into()))?
                .to_string(),
            type_: data["type"]
                .as_str()
                .ok_or_else(|| VerificationError::ClientData("Missing type".into()))?
                .to_string(),
            raw_data,
        })
    }

    /// Verify type, challenge and origin against the expected ceremony values.
    /// The challenge comparison is constant-time.
    pub(crate) fn verify(
        &self,
        expected_type: &str,
        expected_challenge: &str,
        expected_origin: &str,
    ) -> Result<(), VerificationError> {
        if self.type_ != expected_type {
            return Err(VerificationError::ClientData(format!(
                "Invalid type. Expected '{expected_type}', Got: {}",
                self.type_
            )));
        }

        let challenge_matches: bool = self
            .challenge
            .as_bytes()
            .ct_eq(expected_challenge.as_bytes())
            .into();
        if !challenge_matches {
            return Err(VerificationError::Challenge(
                "Challenge mismatch".to_string(),
            ));
        }

        if self.origin != expected_origin {
            return Err(VerificationError::ClientData(format!(
                "Invalid origin. Expected: {expected_origin}, Got: {}",
                self.origin
            )));
        }

        Ok(())
    }
}

/// Flags for AuthenticatorData as defined in WebAuthn Level 2
mod auth_data_flags {
    /// User Present (UP) - Bit 0
    pub(super) const UP: u8 = 1 << 0;
    /// User Verified (UV) - Bit 2
    pub(super) const UV: u8 = 1 << 2;
    /// Attested Credential Data Present (AT) - Bit 6
    pub(super) const AT: u8 = 1 << 6;
}

/// AuthenticatorData structure as defined in WebAuthn Level 2.
/// Layout (minimum 37 bytes): RP ID hash (32) | flags (1) | counter (4) |
/// optional attested credential data | optional extensions.
#[derive(Debug)]
pub(crate) struct AuthenticatorData {
    pub(crate) rp_id_hash: Vec<u8>,
    pub(crate) flags: u8,
    /// Signature counter, 32-bit unsigned big-endian
    pub(crate) counter: u32,
    /// Raw bytes, needed to reconstruct the signed payload
    pub(crate) raw_data: Vec<u8>,
}

impl AuthenticatorData {
    pub(crate) fn parse(data: Vec<u8>) -> Result<Self, VerificationError> {
        if data.len() < 37 {
            return Err(VerificationError::AuthenticatorData(
                "Authenticator data too short".into(),
            ));
        }

        Ok(Self {
            rp_id_hash: data[..32].to_vec(),
            flags: data[32],
            counter: u32::from_be_bytes([data[33], data[34], data[35], data[36]]),
            raw_data: data,
        })
    }

    pub(crate) fn from_base64(auth_data: &str) -> Result<Self, VerificationError> {
        let data = base64url_decode(auth_data)
            .map_err(|e| VerificationError::Format(format!("Failed to decode: {e}")))?;
        Self::parse(data)
    }

    pub(crate) fn is_user_present(&self) -> bool {
        (self.flags & auth_data_flags::UP) != 0
    }

    pub(crate) fn is_user_verified(&self) -> bool {
        (self.flags & auth_data_flags::UV) != 0
    }

    pub(crate) fn has_attested_credential_data(&self) -> bool {
        (self.flags & auth_data_flags::AT) != 0
    }

    /// Verify the RP ID hash matches SHA-256 of the expected RP ID.
    pub(crate) fn verify_rp_id_hash(&self, expected_rp_id: &str) -> Result<(), VerificationError> {
        let expected_hash = digest::digest(&digest::SHA256, expected_rp_id.as_bytes());
        if self.rp_id_hash != expected_hash.as_ref() {
            return Err(VerificationError::AuthenticatorData(
                "Invalid RP ID hash".to_string(),
            ));
        }
        Ok(())
    }
}
