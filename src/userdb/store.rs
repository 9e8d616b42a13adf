use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::errors::UserError;
use super::types::{Credential, UserAccount, derive_user_id, normalize_username};

/// Store interface for the identity directory. Initialized once at startup;
/// the surrounding mutex serializes per-account mutation.
#[async_trait]
pub(crate) trait UserStore: Send + Sync + 'static {
    /// Initialize the store. Called when the store is created.
    async fn init(&self) -> Result<(), UserError>;

    async fn get(&self, user_id: &str) -> Result<Option<UserAccount>, UserError>;

    /// Insert a brand-new account. Fails with `AlreadyExists` when the
    /// identifier is taken: registration is first-write-wins, not an upsert.
    async fn insert_new(&mut self, account: UserAccount) -> Result<(), UserError>;

    async fn append_credential(
        &mut self,
        user_id: &str,
        credential: Credential,
    ) -> Result<(), UserError>;

    /// Overwrite a credential's sign count and refresh its last-used time.
    async fn update_sign_count(
        &mut self,
        user_id: &str,
        credential_id: &str,
        sign_count: u32,
    ) -> Result<(), UserError>;
}

pub(crate) struct InMemoryUserStore {
    accounts: HashMap<String, UserAccount>,
}

impl InMemoryUserStore {
    pub(crate) fn new() -> Self {
        tracing::info!("Creating new in-memory user store");
        Self {
            accounts: HashMap::new(),
        }
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn init(&self) -> Result<(), UserError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn get(&self, user_id: &str) -> Result<Option<UserAccount>, UserError> {
        Ok(self.accounts.get(user_id).cloned())
    }

    async fn insert_new(&mut self, account: UserAccount) -> Result<(), UserError> {
        if self.accounts.contains_key(&account.id) {
            return Err(UserError::AlreadyExists);
        }
        self.accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn append_credential(
        &mut self,
        user_id: &str,
        credential: Credential,
    ) -> Result<(), UserError> {
        let account = self
            .accounts
            .get_mut(user_id)
            .ok_or(UserError::NotFound)?;
        // Duplicate credential ids within an account are not validated here.
        account.credentials.push(credential);
        Ok(())
    }

    async fn update_sign_count(
        &mut self,
        user_id: &str,
        credential_id: &str,
        sign_count: u32,
    ) -> Result<(), UserError> {
        let account = self
            .accounts
            .get_mut(user_id)
            .ok_or(UserError::NotFound)?;
        let credential = account
            .credentials
            .iter_mut()
            .find(|c| c.credential_id == credential_id)
            .ok_or_else(|| {
                UserError::InvalidData(format!("Credential not found: {credential_id}"))
            })?;
        credential.sign_count = sign_count;
        credential.last_used_at = chrono::Utc::now();
        Ok(())
    }
}

static USER_STORE: LazyLock<Mutex<Box<dyn UserStore>>> =
    LazyLock::new(|| Mutex::new(Box::new(InMemoryUserStore::new())));

pub(crate) async fn init() -> Result<(), UserError> {
    USER_STORE.lock().await.init().await
}

/// Look up an account by username without creating it.
pub async fn lookup_account(username: &str) -> Result<Option<UserAccount>, UserError> {
    let normalized = normalize_username(username);
    let user_id = derive_user_id(&normalized);
    USER_STORE.lock().await.get(&user_id).await
}

/// Get-or-create by derived identifier. "Already exists" is not an error here.
pub async fn resolve_or_create(username: &str) -> Result<UserAccount, UserError> {
    let normalized = normalize_username(username);
    let user_id = derive_user_id(&normalized);

    let mut store = USER_STORE.lock().await;
    if let Some(existing) = store.get(&user_id).await? {
        return Ok(existing);
    }
    let account = UserAccount::new(user_id, normalized);
    store.insert_new(account.clone()).await?;
    tracing::debug!("Created account {} ({})", account.username, account.id);
    Ok(account)
}

/// First-write-wins creation for registration begin.
pub async fn create_account(username: &str) -> Result<UserAccount, UserError> {
    let normalized = normalize_username(username);
    let user_id = derive_user_id(&normalized);

    let mut store = USER_STORE.lock().await;
    if store.get(&user_id).await?.is_some() {
        tracing::debug!("User {} already exists ({})", normalized, user_id);
        return Err(UserError::AlreadyExists);
    }
    let account = UserAccount::new(user_id, normalized);
    store.insert_new(account.clone()).await?;
    tracing::debug!("Adding user: {} ({})", account.username, account.id);
    Ok(account)
}

pub async fn get_account(user_id: &str) -> Result<Option<UserAccount>, UserError> {
    USER_STORE.lock().await.get(user_id).await
}

pub(crate) async fn append_credential(
    user_id: &str,
    credential: Credential,
) -> Result<(), UserError> {
    USER_STORE
        .lock()
        .await
        .append_credential(user_id, credential)
        .await
}

pub(crate) async fn update_sign_count(
    user_id: &str,
    credential_id: &str,
    sign_count: u32,
) -> Result<(), UserError> {
    USER_STORE
        .lock()
        .await
        .update_sign_count(user_id, credential_id, sign_count)
        .await
}
