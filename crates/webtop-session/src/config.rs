//! Orchestrator configuration.

use std::time::Duration;

use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Externally visible origin of the reverse proxy, e.g.
    /// `https://webtop.example.com`.
    pub public_base_url: String,
    /// Period of the background reconciliation sweep.
    pub reconcile_interval: Duration,
    /// Environment passed to every session container (`KEY=value`).
    pub container_env: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost".into(),
            reconcile_interval: Duration::from_secs(60),
            container_env: vec!["PUID=1000".into(), "PGID=1000".into(), "TZ=Etc/UTC".into()],
        }
    }
}

impl OrchestratorConfig {
    /// Path the reverse proxy routes to a session's container.
    pub fn session_path(session_id: Uuid) -> String {
        format!("/sessions/{session_id}")
    }

    pub fn access_url(&self, session_id: Uuid) -> String {
        format!(
            "{}{}/",
            self.public_base_url.trim_end_matches('/'),
            Self::session_path(session_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_url_joins_base_and_session_path() {
        let id = Uuid::nil();
        let config = OrchestratorConfig {
            public_base_url: "https://webtop.example.com/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.access_url(id),
            "https://webtop.example.com/sessions/00000000-0000-0000-0000-000000000000/"
        );
    }
}
