use thiserror::Error;

#[derive(Clone, Error, Debug)]
pub enum UserError {
    /// Registration is first-write-wins: the derived identifier is taken.
    #[error("User already exists")]
    AlreadyExists,

    #[error("User not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_sync_and_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<UserError>();
    }

    #[test]
    fn test_error_display() {
        assert_eq!(UserError::AlreadyExists.to_string(), "User already exists");
        assert_eq!(UserError::NotFound.to_string(), "User not found");
        assert_eq!(
            UserError::Storage("boom".to_string()).to_string(),
            "Storage error: boom"
        );
    }
}
