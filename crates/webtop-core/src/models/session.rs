//! Session domain model.
//!
//! A session binds one user, one application and one remote container.
//! The container identifier is written once at insert and never updated.
//! A session is active while `ended_at` is `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub container_id: String,
    pub access_url: String,
    pub persistent: bool,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Persisted sessions are only ever `Active` or `Ended`; the other
    /// states exist while an orchestrator call is in flight.
    pub fn state(&self) -> SessionState {
        if self.is_active() {
            SessionState::Active
        } else {
            SessionState::Ended
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    /// Pre-assigned id; the store generates one when `None`.
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub application_id: Uuid,
    pub container_id: String,
    pub access_url: String,
    pub persistent: bool,
}

/// Lifecycle of a session.
///
/// `Requested → Provisioning → Active → Stopping → Ended`, with `Failed`
/// reachable from `Provisioning`. Never resurrected once `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Requested,
    Provisioning,
    Active,
    Stopping,
    Ended,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::Provisioning => write!(f, "provisioning"),
            Self::Active => write!(f, "active"),
            Self::Stopping => write!(f, "stopping"),
            Self::Ended => write!(f, "ended"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// What a client needs to reach a freshly launched container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDescriptor {
    pub session_id: Uuid,
    pub container_id: String,
    pub access_url: String,
}

impl From<&Session> for AccessDescriptor {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            container_id: session.container_id.clone(),
            access_url: session.access_url.clone(),
        }
    }
}
