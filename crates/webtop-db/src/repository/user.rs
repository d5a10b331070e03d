//! SurrealDB implementation of [`UserRepository`].
//!
//! Accounts are only ever looked up by id (token subject) or username
//! (login). Passwords arrive in clear text and are stored as Argon2id PHC
//! strings; `webtop-auth` verifies them with the same optional pepper.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;
use webtop_core::error::{WebtopError, WebtopResult};
use webtop_core::models::user::{CreateUser, User};
use webtop_core::repository::UserRepository;

use crate::error::{DbError, parse_uuid};

const SELECT_USERS: &str = "SELECT meta::id(id) AS record_id, * FROM users";

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    username: String,
    password_hash: String,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, DbError> {
        Ok(User {
            id: parse_uuid(&row.record_id, "user")?,
            username: row.username,
            password_hash: row.password_hash,
            is_admin: row.is_admin,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
    pepper: Option<String>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db, pepper: None }
    }

    /// Must be given the same pepper the credential verifier uses.
    pub fn with_pepper(db: Surreal<C>, pepper: String) -> Self {
        Self {
            db,
            pepper: Some(pepper),
        }
    }

    /// Argon2id, m=19 MiB, t=2, p=1, random salt per hash.
    fn hash(&self, password: &str) -> Result<String, DbError> {
        let params = Params::new(19_456, 2, 1, None)
            .map_err(|e| DbError::Query(format!("argon2 params: {e}")))?;
        let peppered = match &self.pepper {
            Some(pepper) => format!("{pepper}{password}"),
            None => password.to_owned(),
        };
        let salt = SaltString::generate(&mut OsRng);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(peppered.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DbError::Query(format!("password hashing failed: {e}")))
    }

    async fn fetch(&self, id: Uuid) -> Result<User, DbError> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('users', $id)")
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<UserRow> = result.take(0)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::NotFound {
                entity: "user".into(),
                id: id.to_string(),
            })?
            .try_into()
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> WebtopResult<User> {
        let username = input.username.trim().to_owned();
        if username.is_empty() {
            return Err(WebtopError::Validation {
                message: "username must not be empty".into(),
            });
        }
        let id = Uuid::new_v4();
        let password_hash = self.hash(&input.password)?;

        self.db
            .query(
                "CREATE type::record('users', $id) SET \
                 username = $username, \
                 password_hash = $password_hash, \
                 is_admin = $is_admin \
                 RETURN NONE",
            )
            .bind(("id", id.to_string()))
            .bind(("username", username))
            .bind(("password_hash", password_hash))
            .bind(("is_admin", input.is_admin))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::from_write("user", e))?;

        Ok(self.fetch(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> WebtopResult<User> {
        Ok(self.fetch(id).await?)
    }

    async fn get_by_username(&self, username: &str) -> WebtopResult<User> {
        let mut result = self
            .db
            .query(format!("{SELECT_USERS} WHERE username = $username LIMIT 1"))
            .bind(("username", username.trim().to_owned()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("username={username}"),
        })?;
        Ok(User::try_from(row)?)
    }

    async fn set_password(&self, id: Uuid, new_password: &str) -> WebtopResult<()> {
        // Existence first: UPDATE on a missing record id is a silent no-op.
        self.fetch(id).await?;
        let password_hash = self.hash(new_password)?;
        self.db
            .query("UPDATE type::record('users', $id) SET password_hash = $password_hash RETURN NONE")
            .bind(("id", id.to_string()))
            .bind(("password_hash", password_hash))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    /// Owned sessions go with the account (schema event).
    async fn delete(&self, id: Uuid) -> WebtopResult<()> {
        self.db
            .query("DELETE type::record('users', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}
