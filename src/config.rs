use std::{env, sync::LazyLock};

/// Expected origin of authenticator responses (scheme + host + port).
pub(crate) static ORIGIN: LazyLock<String> = LazyLock::new(|| {
    env::var("ORIGIN").unwrap_or_else(|_| "http://localhost:5000".to_string())
});

/// Relying-party identifier: the origin's host, stripped of scheme and port.
pub(crate) static RP_ID: LazyLock<String> = LazyLock::new(|| {
    ORIGIN
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split(':')
        .next()
        .map(|s| s.to_string())
        .expect("Could not extract RP ID from ORIGIN")
});

/// Human-readable relying-party name shown by the authenticator UI.
pub(crate) static RP_NAME: LazyLock<String> =
    LazyLock::new(|| env::var("RP_NAME").unwrap_or_else(|_| "Sample RP".to_string()));

/// Fixed salt mixed into the username hash that yields stable user identifiers.
pub(crate) static USER_ID_SALT: LazyLock<String> =
    LazyLock::new(|| env::var("USER_ID_SALT").unwrap_or_else(|_| "some string".to_string()));

/// Ceremony timeout advertised to the client, in seconds.
pub(crate) static CEREMONY_TIMEOUT: LazyLock<u32> = LazyLock::new(|| {
    env::var("CEREMONY_TIMEOUT")
        .map(|v| v.parse::<u32>().unwrap_or(60))
        .unwrap_or(60)
});

/// User-verification requirement advertised in ceremony options.
pub(crate) static USER_VERIFICATION: LazyLock<String> = LazyLock::new(|| {
    env::var("USER_VERIFICATION").map_or("required".to_string(), |v| {
        match v.to_lowercase().as_str() {
            "required" => "required".to_string(),
            "preferred" => "preferred".to_string(),
            "discouraged" => "discouraged".to_string(),
            invalid => {
                tracing::warn!("Invalid user verification: {}. Using default 'required'", invalid);
                "required".to_string()
            }
        }
    })
});

/// Whether finish-authentication rejects assertions lacking the UV flag.
pub(crate) static AUTH_REQUIRE_USER_VERIFICATION: LazyLock<bool> = LazyLock::new(|| {
    env::var("AUTH_REQUIRE_USER_VERIFICATION")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false)
});

/// Attestation conveyance preference requested at registration.
pub(crate) static ATTESTATION: LazyLock<String> =
    LazyLock::new(|| match env::var("ATTESTATION").ok() {
        None => "none".to_string(),
        Some(v) => match v.to_lowercase().as_str() {
            "none" => "none".to_string(),
            "direct" => "direct".to_string(),
            "indirect" => "indirect".to_string(),
            "enterprise" => "enterprise".to_string(),
            invalid => {
                tracing::warn!("Invalid attestation: {}. Using default 'none'", invalid);
                "none".to_string()
            }
        },
    });

/// COSE algorithm identifier for ECDSA P-256 / SHA-256.
pub(crate) const COSE_ALG_ES256: i32 = -7;
/// COSE algorithm identifier for RSASSA-PKCS1-v1_5 / SHA-256.
pub(crate) const COSE_ALG_RS256: i32 = -257;

/// Signature algorithms offered in registration options, in preference order.
pub(crate) const PUB_KEY_ALGS: [i32; 2] = [COSE_ALG_ES256, COSE_ALG_RS256];

/// Size in bytes of freshly issued ceremony challenges.
pub(crate) const CHALLENGE_SIZE: usize = 32;
