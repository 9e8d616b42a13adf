//! End-to-end ceremony flows through the public API, with genuinely signed
//! authenticator responses (P-256 keys generated per test).

use std::sync::Once;

use ciborium::value::Value;
use ring::digest;
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use serde_json::json;
use serial_test::serial;

use passkey_rp::{
    CeremonyError, finish_authentication, finish_registration, get_user_from_session,
    lookup_account, normalize_username, start_authentication, start_registration,
};

const ORIGIN: &str = "http://localhost:5000";
const RP_ID: &str = "localhost";

static INIT: Once = Once::new();

fn init_env() {
    INIT.call_once(|| {
        // Pin the RP configuration before the lazily-initialized config is
        // first read.
        unsafe {
            std::env::set_var("ORIGIN", ORIGIN);
        }
    });
}

fn base64url(bytes: Vec<u8>) -> String {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    URL_SAFE_NO_PAD.encode(bytes)
}

fn unique_username(tag: &str) -> String {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 6];
    ring::rand::SecureRandom::fill(&rng, &mut bytes).unwrap();
    format!("{tag}-{}", base64url(bytes.to_vec()))
}

fn challenge_of(options: &impl serde::Serialize) -> String {
    let json = serde_json::to_value(options).unwrap();
    json["challenge"].as_str().unwrap().to_string()
}

/// A software authenticator: one resident P-256 key pair and credential id.
struct TestAuthenticator {
    key_pair: EcdsaKeyPair,
    rng: SystemRandom,
    credential_id: Vec<u8>,
}

impl TestAuthenticator {
    fn new() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .unwrap();
        let mut credential_id = [0u8; 16];
        ring::rand::SecureRandom::fill(&rng, &mut credential_id).unwrap();
        Self {
            key_pair,
            rng,
            credential_id: credential_id.to_vec(),
        }
    }

    fn credential_id_b64(&self) -> String {
        base64url(self.credential_id.clone())
    }

    fn cose_key_bytes(&self) -> Vec<u8> {
        let point = self.key_pair.public_key().as_ref();
        let map = Value::Map(vec![
            (Value::Integer(1.into()), Value::Integer(2.into())),
            (Value::Integer(3.into()), Value::Integer((-7).into())),
            (Value::Integer((-1).into()), Value::Integer(1.into())),
            (
                Value::Integer((-2).into()),
                Value::Bytes(point[1..33].to_vec()),
            ),
            (
                Value::Integer((-3).into()),
                Value::Bytes(point[33..65].to_vec()),
            ),
        ]);
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&map, &mut bytes).unwrap();
        bytes
    }

    fn client_data(&self, type_: &str, challenge: &str, origin: &str) -> Vec<u8> {
        json!({"type": type_, "challenge": challenge, "origin": origin})
            .to_string()
            .into_bytes()
    }

    /// A `none`-attestation registration response for the given challenge.
    fn register(&self, challenge: &str, origin: &str) -> Vec<u8> {
        let rp_id_hash = digest::digest(&digest::SHA256, RP_ID.as_bytes());

        let mut auth_data = Vec::new();
        auth_data.extend_from_slice(rp_id_hash.as_ref());
        auth_data.push(0x01 | 0x04 | 0x40); // UP | UV | AT
        auth_data.extend_from_slice(&0u32.to_be_bytes());
        auth_data.extend_from_slice(&[0x00; 16]);
        auth_data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
        auth_data.extend_from_slice(&self.credential_id);
        auth_data.extend_from_slice(&self.cose_key_bytes());

        let attestation = Value::Map(vec![
            (
                Value::Text("fmt".to_string()),
                Value::Text("none".to_string()),
            ),
            (Value::Text("attStmt".to_string()), Value::Map(vec![])),
            (Value::Text("authData".to_string()), Value::Bytes(auth_data)),
        ]);
        let mut attestation_bytes = Vec::new();
        ciborium::ser::into_writer(&attestation, &mut attestation_bytes).unwrap();

        serde_json::to_vec(&json!({
            "id": self.credential_id_b64(),
            "rawId": self.credential_id_b64(),
            "type": "public-key",
            "transports": ["internal"],
            "response": {
                "clientDataJSON": base64url(self.client_data("webauthn.create", challenge, origin)),
                "attestationObject": base64url(attestation_bytes),
            },
        }))
        .unwrap()
    }

    /// A signed assertion for the given challenge and counter value.
    fn sign_assertion(&self, challenge: &str, counter: u32) -> Vec<u8> {
        let rp_id_hash = digest::digest(&digest::SHA256, RP_ID.as_bytes());

        let mut auth_data = Vec::new();
        auth_data.extend_from_slice(rp_id_hash.as_ref());
        auth_data.push(0x01 | 0x04); // UP | UV
        auth_data.extend_from_slice(&counter.to_be_bytes());

        let client_data = self.client_data("webauthn.get", challenge, ORIGIN);
        let client_data_hash = digest::digest(&digest::SHA256, &client_data);

        let mut signed_data = auth_data.clone();
        signed_data.extend_from_slice(client_data_hash.as_ref());
        let sig = self.key_pair.sign(&self.rng, &signed_data).unwrap();

        serde_json::to_vec(&json!({
            "id": self.credential_id_b64(),
            "rawId": self.credential_id_b64(),
            "type": "public-key",
            "response": {
                "clientDataJSON": base64url(client_data),
                "authenticatorData": base64url(auth_data),
                "signature": base64url(sig.as_ref().to_vec()),
                "userHandle": null,
            },
        }))
        .unwrap()
    }
}

#[tokio::test]
#[serial]
async fn test_full_registration_and_authentication_flow() {
    init_env();
    let username = unique_username("alice");
    let authenticator = TestAuthenticator::new();

    // Registration ceremony
    let reg_options = start_registration(&username).await.unwrap();
    let reg_challenge = challenge_of(&reg_options);
    let result = finish_registration(&authenticator.register(&reg_challenge, ORIGIN))
        .await
        .unwrap();
    assert!(result.verified);

    let account = lookup_account(&username).await.unwrap().unwrap();
    assert_eq!(account.username, normalize_username(&username));
    assert_eq!(account.credentials.len(), 1);
    assert_eq!(
        account.credentials[0].credential_id,
        authenticator.credential_id_b64()
    );
    assert_eq!(account.credentials[0].transports, vec!["internal"]);
    assert_eq!(account.credentials[0].sign_count, 0);

    // Authentication ceremony against the stored credential
    let auth_options = start_authentication(&username).await.unwrap();
    let options_json = serde_json::to_value(&auth_options).unwrap();
    assert_eq!(options_json["rpId"], RP_ID);
    assert_eq!(
        options_json["allowCredentials"][0]["id"],
        authenticator.credential_id_b64()
    );

    let auth_challenge = challenge_of(&auth_options);
    let grant = finish_authentication(&authenticator.sign_assertion(&auth_challenge, 5))
        .await
        .unwrap();
    assert_eq!(grant.username, normalize_username(&username));

    // Counter stored, session resolvable
    let account = lookup_account(&username).await.unwrap().unwrap();
    assert_eq!(account.credentials[0].sign_count, 5);

    let session_user = get_user_from_session(&grant.session_id).await.unwrap();
    assert_eq!(session_user.username, grant.username);
}

#[tokio::test]
#[serial]
async fn test_replayed_assertion_is_rejected() {
    init_env();
    let username = unique_username("replay");
    let authenticator = TestAuthenticator::new();

    let reg_options = start_registration(&username).await.unwrap();
    finish_registration(&authenticator.register(&challenge_of(&reg_options), ORIGIN))
        .await
        .unwrap();

    let auth_options = start_authentication(&username).await.unwrap();
    let assertion = authenticator.sign_assertion(&challenge_of(&auth_options), 1);

    finish_authentication(&assertion).await.unwrap();

    // Same bytes again: the challenge was consumed by the first finish
    let err = finish_authentication(&assertion).await.unwrap_err();
    assert!(matches!(err, CeremonyError::NoActiveCeremony(_)));
}

#[tokio::test]
#[serial]
async fn test_concurrent_begin_invalidates_earlier_ceremony() {
    init_env();
    let alice = unique_username("alice");
    let bob = unique_username("bob");
    let alice_authenticator = TestAuthenticator::new();
    let bob_authenticator = TestAuthenticator::new();

    for (name, authenticator) in [(&alice, &alice_authenticator), (&bob, &bob_authenticator)] {
        let options = start_registration(name).await.unwrap();
        finish_registration(&authenticator.register(&challenge_of(&options), ORIGIN))
            .await
            .unwrap();
    }

    // Alice begins, then Bob's begin overwrites the authentication slot
    let alice_options = start_authentication(&alice).await.unwrap();
    let alice_challenge = challenge_of(&alice_options);
    start_authentication(&bob).await.unwrap();

    // Alice's finish now runs against Bob's ceremony and must fail
    let err = finish_authentication(&alice_authenticator.sign_assertion(&alice_challenge, 1))
        .await
        .unwrap_err();
    assert_eq!(err.status(), 400);

    // Bob's slot was consumed by the failed attempt; nobody is left pending
    let err = finish_authentication(&bob_authenticator.sign_assertion("stale", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, CeremonyError::NoActiveCeremony(_)));
}

#[tokio::test]
#[serial]
async fn test_registration_with_wrong_origin_is_rejected() {
    init_env();
    let username = unique_username("evil");
    let authenticator = TestAuthenticator::new();

    let options = start_registration(&username).await.unwrap();
    let response = authenticator.register(&challenge_of(&options), "https://evil.example");

    let err = finish_registration(&response).await.unwrap_err();
    assert!(matches!(err, CeremonyError::Verification(_)));
    let body = err.rejection();
    assert_eq!(body["verified"], false);
    assert_eq!(body["status"], 400);

    // Nothing was written to the directory
    let account = lookup_account(&username).await.unwrap().unwrap();
    assert!(account.credentials.is_empty());
}

#[tokio::test]
#[serial]
async fn test_duplicate_registration_returns_406() {
    init_env();
    let username = unique_username("dup");

    start_registration(&username).await.unwrap();
    let err = start_registration(&username).await.unwrap_err();
    assert!(matches!(err, CeremonyError::DuplicateUser));
    assert_eq!(err.status(), 406);
}

#[tokio::test]
#[serial]
async fn test_username_normalization_appends_rp_domain() {
    init_env();
    let bare = unique_username("carol");
    assert!(!bare.contains('@'));

    let options = start_registration(&bare).await.unwrap();
    let options_json = serde_json::to_value(&options).unwrap();
    assert_eq!(
        options_json["user"]["name"],
        format!("{bare}@{RP_ID}").as_str()
    );

    // Already-qualified names pass through untouched
    let qualified = format!("{}@example.org", unique_username("dave"));
    let options = start_registration(&qualified).await.unwrap();
    let options_json = serde_json::to_value(&options).unwrap();
    assert_eq!(options_json["user"]["name"], qualified.as_str());
}
