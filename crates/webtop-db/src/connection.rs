//! Opening the webtop store from a `DATABASE_URL`.
//!
//! `mem://` selects the embedded in-memory engine (tests, local
//! development); `ws://` and `wss://` reach a SurrealDB server and sign in
//! as root. Any other scheme is rejected before a connection is attempted.

use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::{debug, info};

use crate::error::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEngine {
    Memory,
    Remote,
}

/// Root credentials, only presented to remote servers.
#[derive(Clone)]
pub struct DbCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<DbCredentials>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "webtop".into(),
            database: "main".into(),
            credentials: None,
        }
    }
}

impl DbConfig {
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".into(),
            ..Self::default()
        }
    }

    pub fn engine(&self) -> Result<StoreEngine, DbError> {
        let scheme = self
            .url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| DbError::Connection(format!("DATABASE_URL has no scheme: {}", self.url)))?;
        match scheme.as_str() {
            "mem" => Ok(StoreEngine::Memory),
            "ws" | "wss" => Ok(StoreEngine::Remote),
            other => Err(DbError::Connection(format!(
                "unsupported DATABASE_URL scheme `{other}` (expected mem, ws or wss)"
            ))),
        }
    }
}

/// Owns the store handle shared by every repository.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
    engine: StoreEngine,
}

impl DbManager {
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        let engine = config.engine()?;
        info!(
            ?engine,
            namespace = %config.namespace,
            database = %config.database,
            "Opening session store"
        );

        let db = any::connect(config.url.as_str())
            .await
            .map_err(|e| DbError::Connection(format!("cannot open {}: {e}", config.url)))?;

        match (engine, &config.credentials) {
            (StoreEngine::Remote, Some(credentials)) => {
                db.signin(Root {
                    username: credentials.username.clone(),
                    password: credentials.password.clone(),
                })
                .await
                .map_err(|e| DbError::Connection(format!("sign-in rejected: {e}")))?;
            }
            (StoreEngine::Remote, None) => {
                debug!("No database credentials configured; connecting unauthenticated");
            }
            (StoreEngine::Memory, _) => {}
        }

        db.use_ns(&config.namespace).use_db(&config.database).await?;

        info!(?engine, "Session store ready");
        Ok(Self { db, engine })
    }

    pub fn engine(&self) -> StoreEngine {
        self.engine
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}
