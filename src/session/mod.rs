//! Session grants issued after a verified authentication.
//!
//! A session asserts `logged_in_user = username` for the client that holds
//! the session id. How the id travels (cookie, header) is the transport
//! layer's concern; expiry beyond explicit deletion is too.

mod errors;

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

pub use errors::SessionError;

use crate::utils::gen_random_string;

const SESSION_ID_LENGTH: usize = 32;

/// The authenticated identity a session asserts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionUser {
    pub user_id: String,
    pub username: String,
}

/// A freshly established session, returned by finish-authentication.
#[derive(Debug, Clone, Serialize)]
pub struct SessionGrant {
    pub session_id: String,
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone)]
struct StoredSession {
    user_id: String,
    username: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

static SESSION_STORE: LazyLock<Mutex<HashMap<String, StoredSession>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Create a session for a verified user. Only finish-authentication calls this.
pub(crate) async fn new_session(
    user_id: &str,
    username: &str,
) -> Result<SessionGrant, SessionError> {
    let session_id = gen_random_string(SESSION_ID_LENGTH)?;

    let stored = StoredSession {
        user_id: user_id.to_string(),
        username: username.to_string(),
        created_at: Utc::now(),
    };
    SESSION_STORE
        .lock()
        .await
        .insert(session_id.clone(), stored);

    tracing::debug!("Session established for user {}", username);

    Ok(SessionGrant {
        session_id,
        user_id: user_id.to_string(),
        username: username.to_string(),
    })
}

/// Resolve a session id to the user it asserts.
pub async fn get_user_from_session(session_id: &str) -> Result<SessionUser, SessionError> {
    let store = SESSION_STORE.lock().await;
    let stored = store.get(session_id).ok_or(SessionError::NotFound)?;
    Ok(SessionUser {
        user_id: stored.user_id.clone(),
        username: stored.username.clone(),
    })
}

/// Drop a session (logout). Removing an unknown id is not an error.
pub async fn delete_session(session_id: &str) -> Result<(), SessionError> {
    if let Some(stored) = SESSION_STORE.lock().await.remove(session_id) {
        tracing::debug!("User {} logged out", stored.username);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_grant_and_lookup() {
        let grant = new_session("user-1", "alice@example.com").await.unwrap();
        assert_eq!(grant.username, "alice@example.com");
        assert_eq!(grant.session_id.len(), 43); // 32 bytes base64url

        let user = get_user_from_session(&grant.session_id).await.unwrap();
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.username, "alice@example.com");
    }

    #[tokio::test]
    async fn test_unknown_session_not_found() {
        let result = get_user_from_session("no-such-session").await;
        assert!(matches!(result, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_session_logs_out() {
        let grant = new_session("user-2", "bob@example.com").await.unwrap();
        delete_session(&grant.session_id).await.unwrap();

        let result = get_user_from_session(&grant.session_id).await;
        assert!(matches!(result, Err(SessionError::NotFound)));

        // Deleting again is a no-op
        assert!(delete_session(&grant.session_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_ids_are_unique() {
        let a = new_session("user-3", "carol@example.com").await.unwrap();
        let b = new_session("user-3", "carol@example.com").await.unwrap();
        assert_ne!(a.session_id, b.session_id);
    }
}
