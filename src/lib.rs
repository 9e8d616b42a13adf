//! passkey-rp - WebAuthn relying-party ceremony library
//!
//! This crate drives passwordless registration and authentication ceremonies:
//! it issues single-use challenges bound to a user identity, validates
//! authenticator responses against stored public-key credentials, and
//! establishes a session on successful authentication.
//!
//! The surrounding transport (HTTP routing, page rendering, cookies) and
//! durable persistence are external concerns. A typical handler wiring:
//!
//! ```no_run
//! use passkey_rp::{finish_authentication, start_authentication};
//!
//! # async fn handle(username: &str, body: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let options = start_authentication(username).await?;
//! // ... serialize `options` to the client, receive the signed response ...
//! let grant = finish_authentication(&body).await?;
//! println!("logged in: {}", grant.username);
//! # Ok(())
//! # }
//! ```

mod ceremony;
mod config;
mod session;
mod userdb;
mod utils;
mod webauthn;

pub use ceremony::{
    AuthenticationOptions, CeremonyError, CeremonyKind, FinishResult, RegistrationOptions,
    finish_authentication, finish_authentication_with, finish_registration,
    finish_registration_with, start_authentication, start_registration,
};

pub use session::{
    SessionError, SessionGrant, SessionUser, delete_session, get_user_from_session,
};

pub use userdb::{
    Credential, UserAccount, UserError, derive_user_id, get_account, lookup_account,
    normalize_username, resolve_or_create,
};

pub use utils::UtilError;

pub use webauthn::{
    AuthenticationVerification, CredentialVerifier, RegistrationVerification, VerificationError,
    WebauthnVerifier,
};

/// Initialize the library: load `.env`, force configuration evaluation and
/// initialize the backing stores. Call once at startup.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Surface configuration problems early
    let _ = *config::RP_ID;
    tracing::info!(
        "Relying party configured: id={}, origin={}",
        config::RP_ID.as_str(),
        config::ORIGIN.as_str()
    );

    userdb::init().await?;

    Ok(())
}
