mod errors;
mod store;
mod types;

pub use errors::UserError;
pub use types::{Credential, UserAccount};
pub use types::{derive_user_id, normalize_username};

pub use store::{create_account, get_account, lookup_account, resolve_or_create};
pub(crate) use store::{append_credential, update_sign_count};

pub(crate) async fn init() -> Result<(), UserError> {
    store::init().await
}
