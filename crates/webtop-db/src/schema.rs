//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings; the record id of every row is its UUID.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users
-- =======================================================================
DEFINE TABLE users SCHEMAFULL;
DEFINE FIELD username ON TABLE users TYPE string;
DEFINE FIELD password_hash ON TABLE users TYPE string;
DEFINE FIELD is_admin ON TABLE users TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE users TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_users_username ON TABLE users \
    COLUMNS username UNIQUE;

-- =======================================================================
-- Applications (catalog, read-only to the orchestrator)
-- =======================================================================
DEFINE TABLE applications SCHEMAFULL;
DEFINE FIELD name ON TABLE applications TYPE string;
DEFINE FIELD logo_url ON TABLE applications TYPE option<string>;
DEFINE FIELD repository_url ON TABLE applications TYPE option<string>;
DEFINE FIELD image ON TABLE applications TYPE string;
DEFINE FIELD docker_compose ON TABLE applications TYPE option<string>;
DEFINE FIELD enabled ON TABLE applications TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE applications TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_applications_name ON TABLE applications \
    COLUMNS name UNIQUE;

-- =======================================================================
-- Sessions
-- container_id is assigned by the platform at creation and never changes.
-- =======================================================================
DEFINE TABLE sessions SCHEMAFULL;
DEFINE FIELD user_id ON TABLE sessions TYPE string;
DEFINE FIELD application_id ON TABLE sessions TYPE string;
DEFINE FIELD container_id ON TABLE sessions TYPE string READONLY;
DEFINE FIELD access_url ON TABLE sessions TYPE string;
DEFINE FIELD persistent ON TABLE sessions TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE sessions TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD ended_at ON TABLE sessions TYPE option<datetime>;
DEFINE INDEX idx_sessions_user ON TABLE sessions \
    COLUMNS user_id;
DEFINE INDEX idx_sessions_application ON TABLE sessions \
    COLUMNS application_id;

-- Cascade deletes from owners to their sessions.
DEFINE EVENT users_cascade_sessions ON TABLE users \
    WHEN $event = 'DELETE' \
    THEN (DELETE sessions WHERE user_id = meta::id($before.id));
DEFINE EVENT applications_cascade_sessions ON TABLE applications \
    WHEN $event = 'DELETE' \
    THEN (DELETE sessions WHERE application_id = meta::id($before.id));

-- =======================================================================
-- Settings (key/value)
-- =======================================================================
DEFINE TABLE settings SCHEMAFULL;
DEFINE FIELD key ON TABLE settings TYPE string;
DEFINE FIELD value ON TABLE settings TYPE string;
DEFINE INDEX idx_settings_key ON TABLE settings \
    COLUMNS key UNIQUE;
";

/// Run all pending migrations against the database.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(version = migration.version, "Migration applied");
        }
    }

    Ok(())
}
