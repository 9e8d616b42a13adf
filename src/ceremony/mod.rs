//! The ceremony orchestrator: drives the four-step WebAuthn flow, wiring the
//! identity directory, challenge ledger, verifier boundary and session layer
//! together. Each ceremony instance moves from challenge issuance to a
//! verified or rejected outcome; failures are terminal and the challenge is
//! consumed either way.

mod auth;
mod challenge;
mod errors;
mod register;
mod types;

pub use auth::{finish_authentication, finish_authentication_with, start_authentication};
pub use challenge::CeremonyKind;
pub use errors::CeremonyError;
pub use register::{finish_registration, finish_registration_with, start_registration};
pub use types::{AuthenticationOptions, FinishResult, RegistrationOptions};
