//! Session orchestrator.
//!
//! Launch validates the application, creates and starts a container, then
//! persists the session. Stop checks ownership, stops the container and
//! marks the session ended. The store is the only source of truth; the
//! per-session locks below only collapse duplicate stops inside one
//! process.
//!
//! Both operations run on a spawned task that the caller awaits, so a
//! dropped request future never abandons a half-finished remote call.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use webtop_core::error::{WebtopError, WebtopResult};
use webtop_core::gateway::{ContainerGateway, ContainerSpec, StopOutcome};
use webtop_core::identity::CallerIdentity;
use webtop_core::models::application::Application;
use webtop_core::models::session::{AccessDescriptor, NewSession, Session, SessionState};
use webtop_core::repository::{ApplicationRepository, SessionRepository};

use crate::config::OrchestratorConfig;

pub const LABEL_SESSION: &str = "webtop.session";
pub const LABEL_USER: &str = "webtop.user";
pub const LABEL_APPLICATION: &str = "webtop.application";

pub struct SessionOrchestrator<S, A, G> {
    pub(crate) inner: Arc<Inner<S, A, G>>,
}

impl<S, A, G> Clone for SessionOrchestrator<S, A, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub(crate) struct Inner<S, A, G> {
    pub(crate) sessions: S,
    applications: A,
    pub(crate) gateway: G,
    config: OrchestratorConfig,
    stop_locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl<S, A, G> SessionOrchestrator<S, A, G>
where
    S: SessionRepository + 'static,
    A: ApplicationRepository + 'static,
    G: ContainerGateway + 'static,
{
    pub fn new(sessions: S, applications: A, gateway: G, config: OrchestratorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions,
                applications,
                gateway,
                config,
                stop_locks: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// Start a container for `application_id` on behalf of `caller`.
    ///
    /// No session row is written unless the container was created and
    /// started.
    pub async fn launch(
        &self,
        caller: CallerIdentity,
        application_id: Uuid,
        persistent: bool,
    ) -> WebtopResult<AccessDescriptor> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.launch(caller, application_id, persistent).await })
            .await
            .map_err(|e| WebtopError::Internal(format!("launch task failed: {e}")))?
    }

    /// Stop a session owned by `caller` (or any session for an admin).
    ///
    /// Stopping an already ended session succeeds without touching the
    /// container platform.
    pub async fn stop(&self, caller: CallerIdentity, session_id: Uuid) -> WebtopResult<Session> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.stop(caller, session_id).await })
            .await
            .map_err(|e| WebtopError::Internal(format!("stop task failed: {e}")))?
    }

    /// The caller's active sessions.
    pub async fn list_own(&self, caller: CallerIdentity) -> WebtopResult<Vec<Session>> {
        self.inner.sessions.find_active_by_user(caller.user_id).await
    }

    /// Every session, including ended ones. Admin only.
    pub async fn list_all(&self, caller: CallerIdentity) -> WebtopResult<Vec<Session>> {
        if !caller.is_admin() {
            return Err(WebtopError::Forbidden {
                reason: "admin role required".into(),
            });
        }
        self.inner.sessions.list_all().await
    }
}

impl<S, A, G> Inner<S, A, G>
where
    S: SessionRepository,
    A: ApplicationRepository,
    G: ContainerGateway,
{
    async fn launch(
        &self,
        caller: CallerIdentity,
        application_id: Uuid,
        persistent: bool,
    ) -> WebtopResult<AccessDescriptor> {
        let application = self.applications.get_by_id(application_id).await?;
        if !application.enabled {
            return Err(WebtopError::ApplicationDisabled {
                id: application_id.to_string(),
            });
        }

        let session_id = Uuid::new_v4();
        debug!(%session_id, user_id = %caller.user_id, %application_id, state = %SessionState::Requested, "Launch requested");

        let spec = self.container_spec(session_id, caller, &application);
        debug!(%session_id, state = %SessionState::Provisioning, image = %spec.image, "Creating container");

        let container_id = self.gateway.create(&spec).await.map_err(|e| {
            warn!(%session_id, error = %e, state = %SessionState::Failed, "Container create failed");
            WebtopError::Gateway(e)
        })?;

        if let Err(e) = self.gateway.start(&container_id).await {
            warn!(%session_id, %container_id, error = %e, state = %SessionState::Failed, "Container start failed");
            if let Err(cleanup) = self.gateway.remove(&container_id).await {
                error!(%session_id, %container_id, error = %cleanup, "Failed to remove orphaned container");
            }
            return Err(WebtopError::LaunchFailed {
                reason: format!("container start failed: {e}"),
            });
        }

        let new_session = NewSession {
            id: Some(session_id),
            user_id: caller.user_id,
            application_id,
            container_id: container_id.clone(),
            access_url: self.config.access_url(session_id),
            persistent,
        };
        let session = match self.sessions.insert(new_session).await {
            Ok(session) => session,
            Err(e) => {
                error!(%session_id, %container_id, error = %e, "Failed to record session, tearing down container");
                self.discard_container(session_id, &container_id).await;
                return Err(e);
            }
        };

        info!(
            session_id = %session.id,
            user_id = %session.user_id,
            application_id = %session.application_id,
            container_id = %session.container_id,
            persistent,
            state = %SessionState::Active,
            "Session launched"
        );
        Ok(AccessDescriptor::from(&session))
    }

    async fn stop(&self, caller: CallerIdentity, session_id: Uuid) -> WebtopResult<Session> {
        let session = self.sessions.find_by_id(session_id).await?;
        if !caller.may_act_on(session.user_id) {
            warn!(%session_id, user_id = %caller.user_id, "Stop refused: not the owner");
            return Err(WebtopError::Forbidden {
                reason: "session belongs to another user".into(),
            });
        }

        let lock = self.session_lock(session_id);
        let result = {
            let _guard = lock.lock().await;
            self.stop_locked(session_id).await
        };
        self.release_session_lock(session_id, lock);
        result
    }

    /// Runs with the session's stop lock held.
    async fn stop_locked(&self, session_id: Uuid) -> WebtopResult<Session> {
        // Re-read: a concurrent stop may have finished while we waited.
        let session = self.sessions.find_by_id(session_id).await?;
        if !session.is_active() {
            debug!(%session_id, "Session already ended");
            return Ok(session);
        }

        let container_id = session.container_id.as_str();
        debug!(%session_id, %container_id, state = %SessionState::Stopping, "Stopping container");

        let outcome = self.gateway.stop(container_id).await.map_err(|e| {
            warn!(%session_id, %container_id, error = %e, "Container stop failed, session left active");
            WebtopError::StopFailed {
                reason: e.to_string(),
            }
        })?;
        if outcome != StopOutcome::Stopped {
            info!(%session_id, %container_id, ?outcome, "Container was not running");
        }

        if !session.persistent && outcome != StopOutcome::Gone {
            if let Err(e) = self.gateway.remove(container_id).await {
                warn!(%session_id, %container_id, error = %e, "Failed to remove stopped container");
            }
        }

        if self.sessions.mark_ended(session_id, Utc::now()).await? {
            info!(%session_id, %container_id, state = %SessionState::Ended, "Session ended");
        }
        self.sessions.find_by_id(session_id).await
    }

    fn container_spec(
        &self,
        session_id: Uuid,
        caller: CallerIdentity,
        application: &Application,
    ) -> ContainerSpec {
        let router = format!("webtop-{session_id}");
        let labels = BTreeMap::from([
            (LABEL_SESSION.to_string(), session_id.to_string()),
            (LABEL_USER.to_string(), caller.user_id.to_string()),
            (LABEL_APPLICATION.to_string(), application.id.to_string()),
            ("traefik.enable".to_string(), "true".to_string()),
            (
                format!("traefik.http.routers.{router}.rule"),
                format!("PathPrefix(`{}`)", OrchestratorConfig::session_path(session_id)),
            ),
        ]);
        ContainerSpec {
            name: session_id.to_string(),
            image: application.image.clone(),
            env: self.config.container_env.clone(),
            labels,
        }
    }

    /// Best-effort stop and remove of a container that has no session row.
    async fn discard_container(&self, session_id: Uuid, container_id: &str) {
        if let Err(e) = self.gateway.stop(container_id).await {
            warn!(%session_id, %container_id, error = %e, "Failed to stop unrecorded container");
        }
        if let Err(e) = self.gateway.remove(container_id).await {
            error!(%session_id, %container_id, error = %e, "Failed to remove unrecorded container");
        }
    }

    fn session_lock(&self, session_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.stop_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(session_id).or_default())
    }

    fn release_session_lock(&self, session_id: Uuid, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.stop_locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(lock);
        let idle = locks
            .get(&session_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1);
        if idle {
            locks.remove(&session_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.stop_locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGateway;
    use webtop_core::identity::Role;
    use webtop_core::models::application::CreateApplication;

    // Minimal stores; the SurrealDB-backed paths are covered under tests/.
    #[derive(Default)]
    struct MemSessions(Mutex<Vec<Session>>);

    impl SessionRepository for MemSessions {
        async fn insert(&self, input: NewSession) -> WebtopResult<Session> {
            let session = Session {
                id: input.id.unwrap_or_else(Uuid::new_v4),
                user_id: input.user_id,
                application_id: input.application_id,
                container_id: input.container_id,
                access_url: input.access_url,
                persistent: input.persistent,
                created_at: Utc::now(),
                ended_at: None,
            };
            self.0.lock().unwrap().push(session.clone());
            Ok(session)
        }
        async fn find_by_id(&self, id: Uuid) -> WebtopResult<Session> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or_else(|| WebtopError::not_found("session", id))
        }
        async fn find_active_by_user(&self, user_id: Uuid) -> WebtopResult<Vec<Session>> {
            let all = self.0.lock().unwrap();
            Ok(all.iter().filter(|s| s.user_id == user_id && s.is_active()).cloned().collect())
        }
        async fn list_active(&self) -> WebtopResult<Vec<Session>> {
            Ok(self.0.lock().unwrap().iter().filter(|s| s.is_active()).cloned().collect())
        }
        async fn list_all(&self) -> WebtopResult<Vec<Session>> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn mark_ended(&self, id: Uuid, ended_at: chrono::DateTime<Utc>) -> WebtopResult<bool> {
            let mut all = self.0.lock().unwrap();
            let session = all
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| WebtopError::not_found("session", id))?;
            if session.ended_at.is_some() {
                return Ok(false);
            }
            session.ended_at = Some(ended_at);
            Ok(true)
        }
    }

    struct OneApp(Application);

    impl ApplicationRepository for OneApp {
        async fn create(&self, _input: CreateApplication) -> WebtopResult<Application> {
            Err(WebtopError::Internal("catalog is fixed".into()))
        }
        async fn get_by_id(&self, id: Uuid) -> WebtopResult<Application> {
            if id == self.0.id {
                Ok(self.0.clone())
            } else {
                Err(WebtopError::not_found("application", id))
            }
        }
        async fn list(&self) -> WebtopResult<Vec<Application>> {
            Ok(vec![self.0.clone()])
        }
        async fn set_enabled(&self, _id: Uuid, _enabled: bool) -> WebtopResult<Application> {
            Err(WebtopError::Internal("catalog is fixed".into()))
        }
        async fn delete(&self, _id: Uuid) -> WebtopResult<()> {
            Err(WebtopError::Internal("catalog is fixed".into()))
        }
    }

    fn app() -> Application {
        Application {
            id: Uuid::new_v4(),
            name: "VS Code".into(),
            logo_url: None,
            repository_url: None,
            image: "lscr.io/linuxserver/code-server:latest".into(),
            docker_compose: None,
            enabled: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn container_spec_carries_routing_labels() {
        let application = app();
        let orchestrator = SessionOrchestrator::new(
            MemSessions::default(),
            OneApp(application.clone()),
            RecordingGateway::new(),
            OrchestratorConfig::default(),
        );
        let caller = CallerIdentity::new(Uuid::new_v4(), Role::User);
        let session_id = Uuid::new_v4();

        let spec = orchestrator.inner.container_spec(session_id, caller, &application);
        assert_eq!(spec.name, session_id.to_string());
        assert_eq!(spec.image, application.image);
        assert_eq!(spec.labels[LABEL_SESSION], session_id.to_string());
        assert_eq!(spec.labels[LABEL_USER], caller.user_id.to_string());
        assert_eq!(spec.labels["traefik.enable"], "true");
        assert_eq!(
            spec.labels[&format!("traefik.http.routers.webtop-{session_id}.rule")],
            format!("PathPrefix(`/sessions/{session_id}`)")
        );
    }

    #[tokio::test]
    async fn stop_locks_are_released() {
        let application = app();
        let orchestrator = SessionOrchestrator::new(
            MemSessions::default(),
            OneApp(application.clone()),
            RecordingGateway::new(),
            OrchestratorConfig::default(),
        );
        let caller = CallerIdentity::new(Uuid::new_v4(), Role::User);

        let access = orchestrator.launch(caller, application.id, false).await.unwrap();
        orchestrator.stop(caller, access.session_id).await.unwrap();
        orchestrator.stop(caller, access.session_id).await.unwrap();

        assert_eq!(orchestrator.inner.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn catalog_errors_surface_without_platform_calls() {
        let gateway = RecordingGateway::new();
        let catalog = OneApp(app());
        assert!(matches!(
            catalog.set_enabled(catalog.0.id, false).await,
            Err(WebtopError::Internal(_))
        ));

        let orchestrator = SessionOrchestrator::new(
            MemSessions::default(),
            catalog,
            gateway.clone(),
            OrchestratorConfig::default(),
        );
        let caller = CallerIdentity::new(Uuid::new_v4(), Role::User);
        let err = orchestrator.launch(caller, Uuid::new_v4(), false).await.unwrap_err();
        assert!(err.is_not_found("application"), "got {err:?}");
        assert!(gateway.calls().is_empty());
    }
}
