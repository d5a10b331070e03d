//! Bearer-token access guard.
//!
//! Establishes *who* is calling. Whether that caller may touch a given
//! session is decided later by the orchestrator from session ownership.

use webtop_core::identity::CallerIdentity;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token;

#[derive(Debug, Clone)]
pub struct AccessGuard {
    config: AuthConfig,
}

impl AccessGuard {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Validate the raw `Authorization` header value.
    ///
    /// Stateless: no store lookup is performed.
    pub fn authorize(&self, authorization: Option<&str>) -> Result<CallerIdentity, AuthError> {
        let token = bearer_token(authorization.unwrap_or_default())?;
        token::decode_access_token(token, &self.config)?.identity()
    }
}

/// Strip the `Bearer` scheme from an `Authorization` header value.
///
/// A blank header, or the scheme with no credential after it, counts as
/// no token at all.
fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let header = header.trim_start();
    let (scheme, credential) = header
        .split_once(char::is_whitespace)
        .unwrap_or((header, ""));
    if scheme.is_empty() {
        return Err(AuthError::MissingToken);
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidToken(format!(
            "unsupported authorization scheme: {scheme}"
        )));
    }
    match credential.trim() {
        "" => Err(AuthError::MissingToken),
        token => Ok(token),
    }
}
