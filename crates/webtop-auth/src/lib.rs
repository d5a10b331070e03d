//! Webtop Auth: password verification, JWT issuance/validation and the
//! bearer-token access guard.

pub mod config;
pub mod error;
pub mod guard;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use guard::AccessGuard;
pub use service::{CredentialVerifier, LoginInput, LoginOutput};
pub use token::AccessTokenClaims;
