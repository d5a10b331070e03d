//! Database-specific error types and conversions.

use webtop_core::error::WebtopError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Cannot connect to the session store: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Stored row is invalid: {0}")]
    InvalidRow(String),
}

impl DbError {
    /// Classify an error raised by a write statement, recognising record-id
    /// and unique-index collisions.
    pub(crate) fn from_write(entity: &str, err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("already exists") || msg.contains("already contains") {
            DbError::AlreadyExists {
                entity: entity.into(),
            }
        } else {
            DbError::Query(msg)
        }
    }
}

impl From<DbError> for WebtopError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => WebtopError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => WebtopError::AlreadyExists { entity },
            other => WebtopError::Database(other.to_string()),
        }
    }
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> Result<uuid::Uuid, DbError> {
    uuid::Uuid::parse_str(raw).map_err(|e| DbError::InvalidRow(format!("invalid {what} UUID: {e}")))
}
