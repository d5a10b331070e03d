//! Launchable application definition.
//!
//! Owned by catalog management; the orchestrator only reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub repository_url: Option<String>,
    /// Container image the gateway creates (e.g. `lscr.io/linuxserver/webtop:latest`).
    pub image: String,
    /// Compose descriptor kept alongside the image for catalog display.
    pub docker_compose: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateApplication {
    pub name: String,
    pub logo_url: Option<String>,
    pub repository_url: Option<String>,
    pub image: String,
    pub docker_compose: Option<String>,
    pub enabled: bool,
}
