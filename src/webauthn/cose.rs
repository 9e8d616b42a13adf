use ciborium::value::{Integer, Value as CborValue};
use ring::signature::{self, UnparsedPublicKey};

use super::errors::VerificationError;
use crate::config::{COSE_ALG_ES256, COSE_ALG_RS256};

// COSE key type identifiers (RFC 9053)
const KTY_EC2: i128 = 2;
const KTY_RSA: i128 = 3;
// P-256 curve identifier for EC2 keys
const CRV_P256: i128 = 1;

/// A credential public key parsed from its COSE representation.
///
/// Supports the two algorithms offered in registration options: ES256
/// (EC2 / P-256) and RS256 (RSASSA-PKCS1-v1_5 / SHA-256).
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CosePublicKey {
    Ec2 { x: Vec<u8>, y: Vec<u8> },
    Rsa { n: Vec<u8>, e: Vec<u8> },
}

impl CosePublicKey {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, VerificationError> {
        let value: CborValue = ciborium::de::from_reader(bytes)
            .map_err(|e| VerificationError::Format(format!("Invalid public key CBOR: {e}")))?;
        Self::from_cbor(&value)
    }

    pub(crate) fn from_cbor(value: &CborValue) -> Result<Self, VerificationError> {
        let CborValue::Map(map) = value else {
            return Err(VerificationError::Format(
                "COSE key is not a CBOR map".to_string(),
            ));
        };

        let mut kty = None;
        let mut alg = None;
        // Label meaning depends on kty: -1/-2/-3 are crv/x/y for EC2, n/e for RSA
        let mut label_1 = None;
        let mut label_2 = None;
        let mut label_3 = None;

        for (key, val) in map {
            let CborValue::Integer(i) = key else { continue };
            if *i == Integer::from(1) {
                if let CborValue::Integer(t) = val {
                    kty = Some(i128::from(*t));
                }
            } else if *i == Integer::from(3) {
                if let CborValue::Integer(a) = val {
                    alg = Some(i128::from(*a));
                }
            } else if *i == Integer::from(-1) {
                label_1 = Some(val.clone());
            } else if *i == Integer::from(-2) {
                label_2 = Some(val.clone());
            } else if *i == Integer::from(-3) {
                label_3 = Some(val.clone());
            }
        }

        match kty {
            Some(KTY_EC2) => {
                if let Some(a) = alg {
                    if a != COSE_ALG_ES256 as i128 {
                        return Err(VerificationError::Verification(format!(
                            "Unsupported EC2 algorithm: {a}"
                        )));
                    }
                }
                match label_1 {
                    Some(CborValue::Integer(c)) if i128::from(c) == CRV_P256 => {}
                    _ => {
                        return Err(VerificationError::Verification(
                            "Unsupported or missing EC2 curve".to_string(),
                        ));
                    }
                }
                let (Some(CborValue::Bytes(x)), Some(CborValue::Bytes(y))) = (label_2, label_3)
                else {
                    return Err(VerificationError::Format(
                        "Missing or invalid key coordinates".to_string(),
                    ));
                };
                if x.len() != 32 || y.len() != 32 {
                    return Err(VerificationError::Format(
                        "Invalid P-256 coordinate length".to_string(),
                    ));
                }
                Ok(Self::Ec2 { x, y })
            }
            Some(KTY_RSA) => {
                if let Some(a) = alg {
                    if a != COSE_ALG_RS256 as i128 {
                        return Err(VerificationError::Verification(format!(
                            "Unsupported RSA algorithm: {a}"
                        )));
                    }
                }
                let (Some(CborValue::Bytes(n)), Some(CborValue::Bytes(e))) = (label_1, label_2)
                else {
                    return Err(VerificationError::Format(
                        "Missing or invalid RSA modulus/exponent".to_string(),
                    ));
                };
                Ok(Self::Rsa { n, e })
            }
            Some(other) => Err(VerificationError::Verification(format!(
                "Unsupported COSE key type: {other}"
            ))),
            None => Err(VerificationError::Format(
                "COSE key missing kty".to_string(),
            )),
        }
    }

    /// The COSE algorithm this key verifies with.
    pub(crate) fn algorithm(&self) -> i32 {
        match self {
            Self::Ec2 { .. } => COSE_ALG_ES256,
            Self::Rsa { .. } => COSE_ALG_RS256,
        }
    }

    /// Verify `signature` over `message` with this key.
    pub(crate) fn verify_signature(
        &self,
        message: &[u8],
        sig: &[u8],
    ) -> Result<(), VerificationError> {
        match self {
            Self::Ec2 { x, y } => {
                // Uncompressed point format
                let mut point = Vec::with_capacity(65);
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);

                UnparsedPublicKey::new(&signature::ECDSA_P256_SHA256_ASN1, &point)
                    .verify(message, sig)
                    .map_err(|_| {
                        VerificationError::Verification(
                            "Signature verification failed".to_string(),
                        )
                    })
            }
            Self::Rsa { n, e } => {
                let der = rsa_public_key_der(n, e);
                UnparsedPublicKey::new(&signature::RSA_PKCS1_2048_8192_SHA256, &der)
                    .verify(message, sig)
                    .map_err(|_| {
                        VerificationError::Verification(
                            "Signature verification failed".to_string(),
                        )
                    })
            }
        }
    }
}

/// Encode an ASN.1 DER `RSAPublicKey` (RFC 8017): SEQUENCE { n INTEGER, e INTEGER }.
/// This is the key format ring's RSA verification expects.
fn rsa_public_key_der(n: &[u8], e: &[u8]) -> Vec<u8> {
    let n_der = der_integer(n);
    let e_der = der_integer(e);

    let mut content = Vec::with_capacity(n_der.len() + e_der.len());
    content.extend_from_slice(&n_der);
    content.extend_from_slice(&e_der);

    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(0x30); // SEQUENCE
    der_length(&mut out, content.len());
    out.extend_from_slice(&content);
    out
}

fn der_integer(bytes: &[u8]) -> Vec<u8> {
    // Strip leading zero octets, keeping at least one
    let mut start = 0;
    while start + 1 < bytes.len() && bytes[start] == 0 {
        start += 1;
    }
    let trimmed = &bytes[start..];

    let mut out = Vec::with_capacity(trimmed.len() + 3);
    out.push(0x02); // INTEGER
    // Positive integers with the high bit set need a leading zero octet
    let needs_pad = trimmed.first().is_some_and(|b| b & 0x80 != 0);
    der_length(&mut out, trimmed.len() + usize::from(needs_pad));
    if needs_pad {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

fn der_length(out: &mut Vec<u8>, len: usize) {
    if len < 128 {
        out.push(len as u8);
    } else {
        let len_bytes: Vec<u8> = len
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        out.push(0x80 | len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
}
