//! Request and response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use webtop_core::models::application::Application;
use webtop_core::models::session::{AccessDescriptor, Session, SessionState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user_id: Uuid,
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub application_id: Uuid,
    #[serde(default)]
    pub persistent: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub session_id: Uuid,
    pub container_id: String,
    pub access_url: String,
}

impl From<AccessDescriptor> for AccessResponse {
    fn from(access: AccessDescriptor) -> Self {
        Self {
            session_id: access.session_id,
            container_id: access.container_id,
            access_url: access.access_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub container_id: String,
    pub access_url: String,
    pub persistent: bool,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        let state: SessionState = session.state();
        Self {
            id: session.id,
            user_id: session.user_id,
            application_id: session.application_id,
            container_id: session.container_id,
            access_url: session.access_url,
            persistent: session.persistent,
            state: state.to_string(),
            created_at: session.created_at,
            ended_at: session.ended_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub repository_url: Option<String>,
    pub image: String,
    pub enabled: bool,
}

impl From<Application> for ApplicationResponse {
    fn from(app: Application) -> Self {
        Self {
            id: app.id,
            name: app.name,
            logo_url: app.logo_url,
            repository_url: app.repository_url,
            image: app.image,
            enabled: app.enabled,
        }
    }
}
