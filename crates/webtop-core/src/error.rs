//! Error types for the webtop system.

use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum WebtopError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Application {id} is disabled")]
    ApplicationDisabled { id: String },

    #[error("Container gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Launch failed: {reason}")]
    LaunchFailed { reason: String },

    #[error("Stop failed: {reason}")]
    StopFailed { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WebtopError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// True for `NotFound` on the given entity kind.
    pub fn is_not_found(&self, entity: &str) -> bool {
        matches!(self, Self::NotFound { entity: e, .. } if e == entity)
    }
}

pub type WebtopResult<T> = Result<T, WebtopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_matches_entity() {
        let err = WebtopError::not_found("session", "abc");
        assert!(err.is_not_found("session"));
        assert!(!err.is_not_found("application"));
        assert_eq!(err.to_string(), "Entity not found: session with id abc");
    }

    #[test]
    fn gateway_error_converts() {
        let err: WebtopError = GatewayError::Unavailable {
            reason: "timed out".into(),
        }
        .into();
        assert!(matches!(
            err,
            WebtopError::Gateway(GatewayError::Unavailable { .. })
        ));
    }
}
