//! Webtop Session: the orchestrator that ties the container gateway to
//! the session store.

pub mod config;
pub mod orchestrator;
pub mod reconcile;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use config::OrchestratorConfig;
pub use orchestrator::SessionOrchestrator;
pub use reconcile::ReconcileReport;
