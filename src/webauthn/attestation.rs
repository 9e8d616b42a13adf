use ciborium::value::{Integer, Value as CborValue};

use super::cose::CosePublicKey;
use super::errors::VerificationError;
use crate::utils::base64url_decode;

#[derive(Debug)]
pub(crate) struct AttestationObject {
    pub(crate) fmt: String,
    pub(crate) auth_data: Vec<u8>,
    pub(crate) att_stmt: Vec<(CborValue, CborValue)>,
}

impl AttestationObject {
    pub(crate) fn from_base64(attestation_base64: &str) -> Result<Self, VerificationError> {
        let attestation_bytes = base64url_decode(attestation_base64).map_err(|e| {
            VerificationError::Format(format!("Failed to decode attestation object: {e}"))
        })?;

        let attestation_cbor: CborValue = ciborium::de::from_reader(&attestation_bytes[..])
            .map_err(|e| VerificationError::Format(format!("Invalid CBOR data: {e}")))?;

        let CborValue::Map(map) = attestation_cbor else {
            return Err(VerificationError::Format(
                "Invalid attestation format".to_string(),
            ));
        };

        let mut fmt = None;
        let mut auth_data = None;
        let mut att_stmt = None;

        for (key, value) in map {
            if let CborValue::Text(k) = key {
                match k.as_str() {
                    "fmt" => {
                        if let CborValue::Text(f) = value {
                            fmt = Some(f);
                        }
                    }
                    "authData" => {
                        if let CborValue::Bytes(data) = value {
                            auth_data = Some(data);
                        }
                    }
                    "attStmt" => {
                        if let CborValue::Map(stmt) = value {
                            att_stmt = Some(stmt);
                        }
                    }
                    _ => {}
                }
            }
        }

        match (fmt, auth_data, att_stmt) {
            (Some(fmt), Some(auth_data), Some(att_stmt)) => Ok(Self {
                fmt,
                auth_data,
                att_stmt,
            }),
            _ => Err(VerificationError::Format(
                "Missing required attestation data".to_string(),
            )),
        }
    }
}

/// Attested credential data carried in registration authenticator data.
#[derive(Debug)]
pub(crate) struct AttestedCredential {
    pub(crate) credential_id: Vec<u8>,
    pub(crate) cose_key: CborValue,
    /// Canonical CBOR encoding of the COSE key, stored with the credential
    pub(crate) cose_key_bytes: Vec<u8>,
}

/// Walk the attested credential data section: 37-byte header, 16-byte AAGUID,
/// 2-byte credential id length, credential id, then the COSE public key.
pub(crate) fn parse_attested_credential(
    auth_data: &[u8],
) -> Result<AttestedCredential, VerificationError> {
    let mut pos = 37; // RP ID hash (32) + flags (1) + counter (4)

    if auth_data.len() < pos + 18 {
        return Err(VerificationError::Format(
            "Authenticator data too short".to_string(),
        ));
    }

    pos += 16; // AAGUID

    let cred_id_len = ((auth_data[pos] as usize) << 8) | (auth_data[pos + 1] as usize);
    pos += 2;

    if cred_id_len == 0 || cred_id_len > 1024 {
        return Err(VerificationError::Format(
            "Invalid credential ID length".to_string(),
        ));
    }

    if auth_data.len() < pos + cred_id_len {
        return Err(VerificationError::Format(
            "Authenticator data too short for credential ID".to_string(),
        ));
    }

    let credential_id = auth_data[pos..pos + cred_id_len].to_vec();
    pos += cred_id_len;

    let cose_key: CborValue = ciborium::de::from_reader(&auth_data[pos..])
        .map_err(|e| VerificationError::Format(format!("Invalid public key CBOR: {e}")))?;

    // Re-encode so the stored key is exactly one CBOR item, independent of
    // any extension data trailing it in the authenticator data.
    let mut cose_key_bytes = Vec::new();
    ciborium::ser::into_writer(&cose_key, &mut cose_key_bytes)
        .map_err(|e| VerificationError::Format(format!("Failed to encode public key: {e}")))?;

    Ok(AttestedCredential {
        credential_id,
        cose_key,
        cose_key_bytes,
    })
}

fn get_sig_from_stmt(
    att_stmt: &[(CborValue, CborValue)],
) -> Result<(i128, Vec<u8>), VerificationError> {
    let mut alg = None;
    let mut sig = None;

    for (key, value) in att_stmt {
        if let CborValue::Text(k) = key {
            match (k.as_str(), value) {
                ("alg", CborValue::Integer(a)) => alg = Some(i128::from(*a)),
                ("sig", CborValue::Bytes(s)) => sig = Some(s.clone()),
                _ => {}
            }
        }
    }

    match (alg, sig) {
        (Some(alg), Some(sig)) => Ok((alg, sig)),
        _ => Err(VerificationError::Format(
            "Missing algorithm or signature in attestation statement".to_string(),
        )),
    }
}

fn stmt_has_key(att_stmt: &[(CborValue, CborValue)], name: &str) -> bool {
    att_stmt
        .iter()
        .any(|(k, _)| matches!(k, CborValue::Text(t) if t == name))
}

/// Verify the attestation statement against the credential's own public key.
///
/// `none` carries no signature; `packed` is verified as self-attestation.
/// Certificate-chain attestation (x5c) and other formats are rejected:
/// trust-chain validation against manufacturer roots is out of scope.
pub(crate) fn verify_attestation(
    attestation: &AttestationObject,
    client_data_hash: &[u8],
    credential_key: &CosePublicKey,
) -> Result<(), VerificationError> {
    match attestation.fmt.as_str() {
        "none" => {
            if !attestation.att_stmt.is_empty() {
                return Err(VerificationError::Format(
                    "attStmt must be empty for none attestation".to_string(),
                ));
            }
            Ok(())
        }
        "packed" => {
            if stmt_has_key(&attestation.att_stmt, "x5c")
                || stmt_has_key(&attestation.att_stmt, "ecdaaKeyId")
            {
                return Err(VerificationError::Verification(
                    "Certificate-based packed attestation is not supported".to_string(),
                ));
            }

            tracing::debug!("Verifying packed self-attestation");
            let (alg, sig) = get_sig_from_stmt(&attestation.att_stmt)?;
            if alg != credential_key.algorithm() as i128 {
                return Err(VerificationError::Verification(format!(
                    "Attestation algorithm {alg} does not match credential key"
                )));
            }

            let mut signed_data =
                Vec::with_capacity(attestation.auth_data.len() + client_data_hash.len());
            signed_data.extend_from_slice(&attestation.auth_data);
            signed_data.extend_from_slice(client_data_hash);

            credential_key.verify_signature(&signed_data, &sig)
        }
        other => Err(VerificationError::Verification(format!(
            "Unsupported attestation format: {other}"
        ))),
    }
}
