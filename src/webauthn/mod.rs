mod attestation;
mod cose;
mod errors;
mod types;
mod verifier;

pub use errors::VerificationError;
pub use types::{AuthenticatorAssertion, RegisterCredential};
pub use verifier::{
    AuthenticationVerification, CredentialVerifier, RegistrationVerification, WebauthnVerifier,
};
