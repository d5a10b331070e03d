//! HS256 JWT access token issuance and verification.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use webtop_core::identity::{CallerIdentity, Role};

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: user ID (UUID string).
    pub sub: String,
    /// `admin` or `user`.
    pub role: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn identity(&self) -> Result<CallerIdentity, AuthError> {
        let user_id = Uuid::parse_str(&self.sub)
            .map_err(|e| AuthError::InvalidToken(format!("bad subject: {e}")))?;
        let role = Role::parse(&self.role)
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown role: {}", self.role)))?;
        Ok(CallerIdentity::new(user_id, role))
    }
}

fn secret(config: &AuthConfig) -> Result<&[u8], AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::Crypto("token signing secret is not configured".into()));
    }
    Ok(config.jwt_secret.as_bytes())
}

/// Issue a signed access token for `identity` valid for `ttl_secs`.
pub fn issue_access_token(
    identity: &CallerIdentity,
    ttl_secs: i64,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = AccessTokenClaims {
        sub: identity.user_id.to_string(),
        role: identity.role.as_str().to_string(),
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: now + ttl_secs,
        jti: Uuid::new_v4().to_string(),
    };

    let key = EncodingKey::from_secret(secret(config)?);
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify an access token (signature, expiry, issuer).
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_secret(secret(config)?);

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(e.to_string()),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "unit-test-secret".into(),
            jwt_issuer: "webtop-test".into(),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn jwt_roundtrip() {
        let config = test_config();
        let identity = CallerIdentity::new(Uuid::new_v4(), Role::Admin);

        let token = issue_access_token(&identity, 900, &config).unwrap();
        let claims = decode_access_token(&token, &config).unwrap();

        assert_eq!(claims.iss, "webtop-test");
        assert_eq!(claims.identity().unwrap(), identity);
    }

    #[test]
    fn jti_is_unique() {
        let config = test_config();
        let identity = CallerIdentity::new(Uuid::new_v4(), Role::User);

        let t1 = issue_access_token(&identity, 900, &config).unwrap();
        let t2 = issue_access_token(&identity, 900, &config).unwrap();

        let c1 = decode_access_token(&t1, &config).unwrap();
        let c2 = decode_access_token(&t2, &config).unwrap();
        assert_ne!(c1.jti, c2.jti);
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let identity = CallerIdentity::new(Uuid::new_v4(), Role::User);

        let token = issue_access_token(&identity, -120, &config).unwrap();
        assert_eq!(
            decode_access_token(&token, &config).unwrap_err(),
            AuthError::TokenExpired
        );
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let config = test_config();
        let identity = CallerIdentity::new(Uuid::new_v4(), Role::User);
        let token = issue_access_token(&identity, 900, &config).unwrap();

        let other = AuthConfig {
            jwt_secret: "another-secret".into(),
            ..test_config()
        };
        assert!(matches!(
            decode_access_token(&token, &other),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let config = test_config();
        let identity = CallerIdentity::new(Uuid::new_v4(), Role::User);
        let token = issue_access_token(&identity, 900, &config).unwrap();

        let other = AuthConfig {
            jwt_issuer: "someone-else".into(),
            ..test_config()
        };
        assert!(matches!(
            decode_access_token(&token, &other),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let config = AuthConfig::default();
        let identity = CallerIdentity::new(Uuid::new_v4(), Role::User);
        assert!(matches!(
            issue_access_token(&identity, 900, &config),
            Err(AuthError::Crypto(_))
        ));
    }
}
