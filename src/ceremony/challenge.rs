use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::config::CHALLENGE_SIZE;
use crate::utils::{UtilError, gen_random_string};

/// The two ceremony flavors a challenge can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Authentication,
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CeremonyKind::Registration => write!(f, "registration"),
            CeremonyKind::Authentication => write!(f, "authentication"),
        }
    }
}

/// A single-use challenge bound to the subject it was issued for.
#[derive(Debug, Clone)]
pub(crate) struct Challenge {
    pub(crate) value: String,
    pub(crate) user_id: String,
    pub(crate) issued_at: DateTime<Utc>,
}

/// One outstanding challenge slot per ceremony kind, process-wide. Issuing
/// overwrites the slot; consuming clears it. An overwritten challenge is
/// permanently unverifiable, which doubles as the expiry mechanism.
#[derive(Default)]
struct ChallengeLedger {
    registration: Option<Challenge>,
    authentication: Option<Challenge>,
}

impl ChallengeLedger {
    fn slot_mut(&mut self, kind: CeremonyKind) -> &mut Option<Challenge> {
        match kind {
            CeremonyKind::Registration => &mut self.registration,
            CeremonyKind::Authentication => &mut self.authentication,
        }
    }
}

static CHALLENGE_LEDGER: LazyLock<Mutex<ChallengeLedger>> =
    LazyLock::new(|| Mutex::new(ChallengeLedger::default()));

/// Issue a fresh challenge for `kind`, bound to `user_id`.
pub(crate) async fn issue(kind: CeremonyKind, user_id: &str) -> Result<Challenge, UtilError> {
    let challenge = Challenge {
        value: gen_random_string(CHALLENGE_SIZE)?,
        user_id: user_id.to_string(),
        issued_at: Utc::now(),
    };

    let mut ledger = CHALLENGE_LEDGER.lock().await;
    if let Some(previous) = ledger.slot_mut(kind).replace(challenge.clone()) {
        tracing::warn!(
            "Overwriting unconsumed {} challenge for user {} issued at {}",
            kind,
            previous.user_id,
            previous.issued_at
        );
    }

    tracing::debug!("Issued {} challenge for user {}", kind, user_id);
    Ok(challenge)
}

/// Take the outstanding challenge for `kind`, clearing the slot. Returns
/// `None` when no ceremony of that kind is in flight.
pub(crate) async fn consume(kind: CeremonyKind) -> Option<Challenge> {
    CHALLENGE_LEDGER.lock().await.slot_mut(kind).take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    async fn drain() {
        // The ledger is process-wide; start each test from empty slots.
        consume(CeremonyKind::Registration).await;
        consume(CeremonyKind::Authentication).await;
    }

    #[tokio::test]
    #[serial]
    async fn test_consume_is_single_use() {
        drain().await;

        let issued = issue(CeremonyKind::Registration, "user-a").await.unwrap();
        let consumed = consume(CeremonyKind::Registration).await.unwrap();
        assert_eq!(consumed.value, issued.value);
        assert_eq!(consumed.user_id, "user-a");

        // Second consume finds the slot empty
        assert!(consume(CeremonyKind::Registration).await.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_kinds_have_independent_slots() {
        drain().await;

        issue(CeremonyKind::Registration, "user-a").await.unwrap();
        issue(CeremonyKind::Authentication, "user-b").await.unwrap();

        let reg = consume(CeremonyKind::Registration).await.unwrap();
        let auth = consume(CeremonyKind::Authentication).await.unwrap();
        assert_eq!(reg.user_id, "user-a");
        assert_eq!(auth.user_id, "user-b");
        assert_ne!(reg.value, auth.value);
    }

    #[tokio::test]
    #[serial]
    async fn test_issue_overwrites_outstanding_challenge() {
        drain().await;

        let first = issue(CeremonyKind::Authentication, "user-a").await.unwrap();
        let second = issue(CeremonyKind::Authentication, "user-b").await.unwrap();
        assert_ne!(first.value, second.value);

        // Only the later challenge survives; the earlier one is unverifiable
        let consumed = consume(CeremonyKind::Authentication).await.unwrap();
        assert_eq!(consumed.value, second.value);
        assert_eq!(consumed.user_id, "user-b");
        assert!(consume(CeremonyKind::Authentication).await.is_none());
    }

    #[tokio::test]
    #[serial]
    async fn test_challenge_values_are_high_entropy() {
        drain().await;

        let a = issue(CeremonyKind::Registration, "user-a").await.unwrap();
        let b = issue(CeremonyKind::Registration, "user-a").await.unwrap();
        // 32 random bytes -> 43 base64url chars
        assert_eq!(a.value.len(), 43);
        assert_ne!(a.value, b.value);
        drain().await;
    }
}
