//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. The orchestrator depends on
//! these traits only, so stores can be swapped or faked in tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::WebtopResult;
use crate::models::{
    application::{Application, CreateApplication},
    session::{NewSession, Session},
    setting::Setting,
    user::{CreateUser, User},
};

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = WebtopResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WebtopResult<User>> + Send;
    fn get_by_username(&self, username: &str)
    -> impl Future<Output = WebtopResult<User>> + Send;
    /// Replace the stored hash with a fresh hash of `new_password`.
    fn set_password(
        &self,
        id: Uuid,
        new_password: &str,
    ) -> impl Future<Output = WebtopResult<()>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = WebtopResult<()>> + Send;
}

pub trait ApplicationRepository: Send + Sync {
    fn create(
        &self,
        input: CreateApplication,
    ) -> impl Future<Output = WebtopResult<Application>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = WebtopResult<Application>> + Send;
    fn list(&self) -> impl Future<Output = WebtopResult<Vec<Application>>> + Send;
    fn set_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> impl Future<Output = WebtopResult<Application>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = WebtopResult<()>> + Send;
}

/// Authoritative store of session records.
pub trait SessionRepository: Send + Sync {
    /// Persist a session. Fails with `AlreadyExists` if the id is taken.
    fn insert(&self, input: NewSession) -> impl Future<Output = WebtopResult<Session>> + Send;
    fn find_by_id(&self, id: Uuid) -> impl Future<Output = WebtopResult<Session>> + Send;
    /// Active sessions owned by `user_id`, oldest first.
    fn find_active_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = WebtopResult<Vec<Session>>> + Send;
    /// Every active session, oldest first.
    fn list_active(&self) -> impl Future<Output = WebtopResult<Vec<Session>>> + Send;
    /// Every session regardless of owner or state, oldest first.
    fn list_all(&self) -> impl Future<Output = WebtopResult<Vec<Session>>> + Send;
    /// Set `ended_at` if the session is still active.
    ///
    /// Returns `true` when this call ended the session and `false` when it
    /// had already ended.
    fn mark_ended(
        &self,
        id: Uuid,
        ended_at: DateTime<Utc>,
    ) -> impl Future<Output = WebtopResult<bool>> + Send;
}

pub trait SettingsRepository: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = WebtopResult<Option<String>>> + Send;
    fn set(&self, key: &str, value: &str) -> impl Future<Output = WebtopResult<()>> + Send;
    fn all(&self) -> impl Future<Output = WebtopResult<Vec<Setting>>> + Send;
}
