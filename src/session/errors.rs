use thiserror::Error;

use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl From<UtilError> for SessionError {
    fn from(err: UtilError) -> Self {
        SessionError::Crypto(err.to_string())
    }
}
