//! Shared handler state.

use std::sync::Arc;

use surrealdb::{Connection, Surreal};
use webtop_auth::{AccessGuard, AuthConfig, CredentialVerifier};
use webtop_core::gateway::ContainerGateway;
use webtop_db::repository::{
    SurrealApplicationRepository, SurrealSessionRepository, SurrealUserRepository,
};
use webtop_session::{OrchestratorConfig, SessionOrchestrator};

pub type Orchestrator<C, G> =
    SessionOrchestrator<SurrealSessionRepository<C>, SurrealApplicationRepository<C>, G>;

pub struct AppState<C: Connection, G> {
    pub orchestrator: Orchestrator<C, G>,
    pub credentials: Arc<CredentialVerifier<SurrealUserRepository<C>>>,
    pub applications: Arc<SurrealApplicationRepository<C>>,
    pub guard: Arc<AccessGuard>,
}

impl<C: Connection, G> Clone for AppState<C, G> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            credentials: Arc::clone(&self.credentials),
            applications: Arc::clone(&self.applications),
            guard: Arc::clone(&self.guard),
        }
    }
}

impl<C, G> AppState<C, G>
where
    C: Connection,
    G: ContainerGateway + 'static,
{
    /// Wire stores, verifier, guard and orchestrator over one database
    /// handle.
    pub fn new(
        db: Surreal<C>,
        gateway: G,
        auth: AuthConfig,
        orchestrator: OrchestratorConfig,
    ) -> Self {
        let users = match &auth.pepper {
            Some(pepper) => SurrealUserRepository::with_pepper(db.clone(), pepper.clone()),
            None => SurrealUserRepository::new(db.clone()),
        };
        Self {
            orchestrator: SessionOrchestrator::new(
                SurrealSessionRepository::new(db.clone()),
                SurrealApplicationRepository::new(db.clone()),
                gateway,
                orchestrator,
            ),
            credentials: Arc::new(CredentialVerifier::new(users, auth.clone())),
            applications: Arc::new(SurrealApplicationRepository::new(db)),
            guard: Arc::new(AccessGuard::new(auth)),
        }
    }
}
