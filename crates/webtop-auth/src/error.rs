//! Authentication error types.

use thiserror::Error;
use webtop_core::error::WebtopError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    TokenExpired,

    /// Returned for unknown usernames and wrong passwords alike.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for WebtopError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Crypto(msg) => WebtopError::Crypto(msg),
            other => WebtopError::AuthenticationFailed {
                reason: other.to_string(),
            },
        }
    }
}
