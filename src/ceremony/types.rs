use serde::Serialize;

use crate::userdb::Credential;

/// Options for navigator.credentials.create(), in WebAuthn JSON shape.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    pub(crate) challenge: String,
    pub(crate) rp: RelyingParty,
    pub(crate) user: PublicKeyCredentialUserEntity,
    pub(crate) pub_key_cred_params: Vec<PubKeyCredParam>,
    pub(crate) exclude_credentials: Vec<CredentialDescriptor>,
    pub(crate) authenticator_selection: AuthenticatorSelection,
    pub(crate) timeout: u32,
    pub(crate) attestation: String,
}

/// Options for navigator.credentials.get(), in WebAuthn JSON shape.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    pub(crate) challenge: String,
    pub(crate) timeout: u32,
    pub(crate) rp_id: String,
    pub(crate) allow_credentials: Vec<CredentialDescriptor>,
    pub(crate) user_verification: String,
}

#[derive(Serialize, Debug)]
pub(crate) struct RelyingParty {
    pub(crate) id: String,
    pub(crate) name: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublicKeyCredentialUserEntity {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) display_name: String,
}

#[derive(Serialize, Debug)]
pub(crate) struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub(crate) type_: String,
    pub(crate) alg: i32,
}

/// A registered credential as listed in allow/exclude lists.
#[derive(Serialize, Debug)]
pub(crate) struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub(crate) type_: String,
    pub(crate) id: String,
    pub(crate) transports: Vec<String>,
}

impl From<&Credential> for CredentialDescriptor {
    fn from(credential: &Credential) -> Self {
        Self {
            type_: "public-key".to_string(),
            id: credential.credential_id.clone(),
            transports: credential.transports.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthenticatorSelection {
    pub(crate) user_verification: String,
}

/// Successful finish-step result, serialized as `{"verified": true}`.
#[derive(Serialize, Debug, PartialEq)]
pub struct FinishResult {
    pub verified: bool,
}
