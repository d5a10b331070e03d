//! SurrealDB implementation of [`SessionRepository`].
//!
//! The store is the single source of truth for session state; callers
//! re-read it for every decision instead of caching rows.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use webtop_core::error::WebtopResult;
use webtop_core::models::session::{NewSession, Session};
use webtop_core::repository::SessionRepository;

use crate::error::{DbError, parse_uuid};

/// Row for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct SessionRow {
    user_id: String,
    application_id: String,
    container_id: String,
    access_url: String,
    persistent: bool,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

/// Row that carries the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    user_id: String,
    application_id: String,
    container_id: String,
    access_url: String,
    persistent: bool,
    created_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl SessionRow {
    fn into_session(self, id: Uuid) -> Result<Session, DbError> {
        Ok(Session {
            id,
            user_id: parse_uuid(&self.user_id, "user")?,
            application_id: parse_uuid(&self.application_id, "application")?,
            container_id: self.container_id,
            access_url: self.access_url,
            persistent: self.persistent,
            created_at: self.created_at,
            ended_at: self.ended_at,
        })
    }
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        let id = parse_uuid(&self.record_id, "session")?;
        SessionRow {
            user_id: self.user_id,
            application_id: self.application_id,
            container_id: self.container_id,
            access_url: self.access_url,
            persistent: self.persistent,
            created_at: self.created_at,
            ended_at: self.ended_at,
        }
        .into_session(id)
    }
}

fn collect(rows: Vec<SessionRowWithId>) -> Result<Vec<Session>, DbError> {
    rows.into_iter()
        .map(SessionRowWithId::try_into_session)
        .collect()
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_many(&self, query: &'static str, user_id: Option<Uuid>) -> WebtopResult<Vec<Session>> {
        let mut builder = self.db.query(query);
        if let Some(user_id) = user_id {
            builder = builder.bind(("user_id", user_id.to_string()));
        }
        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(collect(rows)?)
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn insert(&self, input: NewSession) -> WebtopResult<Session> {
        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('sessions', $id) SET \
                 user_id = $user_id, \
                 application_id = $application_id, \
                 container_id = $container_id, \
                 access_url = $access_url, \
                 persistent = $persistent, \
                 ended_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("application_id", input.application_id.to_string()))
            .bind(("container_id", input.container_id))
            .bind(("access_url", input.access_url))
            .bind(("persistent", input.persistent))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_write("session", e))?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        Ok(row.into_session(id)?)
    }

    async fn find_by_id(&self, id: Uuid) -> WebtopResult<Session> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('sessions', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        Ok(row.into_session(id)?)
    }

    async fn find_active_by_user(&self, user_id: Uuid) -> WebtopResult<Vec<Session>> {
        self.select_many(
            "SELECT meta::id(id) AS record_id, * FROM sessions \
             WHERE user_id = $user_id AND ended_at = NONE \
             ORDER BY created_at ASC",
            Some(user_id),
        )
        .await
    }

    async fn list_active(&self) -> WebtopResult<Vec<Session>> {
        self.select_many(
            "SELECT meta::id(id) AS record_id, * FROM sessions \
             WHERE ended_at = NONE \
             ORDER BY created_at ASC",
            None,
        )
        .await
    }

    async fn list_all(&self) -> WebtopResult<Vec<Session>> {
        self.select_many(
            "SELECT meta::id(id) AS record_id, * FROM sessions \
             ORDER BY created_at ASC",
            None,
        )
        .await
    }

    async fn mark_ended(&self, id: Uuid, ended_at: DateTime<Utc>) -> WebtopResult<bool> {
        let existing = self.find_by_id(id).await?;
        if !existing.is_active() {
            return Ok(false);
        }

        // The WHERE guard makes a concurrent second caller update nothing.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('sessions', $id) \
                 SET ended_at = $ended_at \
                 WHERE ended_at = NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("ended_at", ended_at))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }
}
