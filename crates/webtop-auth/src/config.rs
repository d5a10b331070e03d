//! Authentication configuration.

/// Configuration for credential verification and the access guard.
///
/// Built once at process start and handed to constructors; nothing in
/// this crate reads the environment.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify HS256 access tokens.
    pub jwt_secret: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 86_400 = 24 hours).
    pub access_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id verification.
    pub pepper: Option<String>,
    /// Minimum length accepted when a password is changed.
    pub min_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "webtop".into(),
            access_token_lifetime_secs: 86_400,
            pepper: None,
            min_password_length: 8,
        }
    }
}
