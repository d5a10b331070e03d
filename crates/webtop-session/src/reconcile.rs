//! Background reconciliation between the session store and the
//! container platform.
//!
//! Sessions whose container the platform no longer knows are ended.
//! Anything short of a confirmed absence (including gateway errors)
//! leaves the session untouched.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use webtop_core::error::WebtopResult;
use webtop_core::gateway::ContainerGateway;
use webtop_core::repository::{ApplicationRepository, SessionRepository};

use crate::orchestrator::SessionOrchestrator;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub checked: usize,
    pub ended: usize,
    /// Sessions whose container could not be inspected.
    pub skipped: usize,
}

impl<S, A, G> SessionOrchestrator<S, A, G>
where
    S: SessionRepository + 'static,
    A: ApplicationRepository + 'static,
    G: ContainerGateway + 'static,
{
    /// Inspect every active session once.
    pub async fn reconcile_once(&self) -> WebtopResult<ReconcileReport> {
        let inner = &self.inner;
        let mut report = ReconcileReport::default();

        for session in inner.sessions.list_active().await? {
            report.checked += 1;
            let container_id = session.container_id.as_str();
            match inner.gateway.inspect(container_id).await {
                Ok(Some(status)) => {
                    debug!(session_id = %session.id, container_id, state = %status.state, "Container present");
                }
                Ok(None) => {
                    if inner.sessions.mark_ended(session.id, Utc::now()).await? {
                        report.ended += 1;
                        info!(session_id = %session.id, container_id, "Container gone, session ended");
                    }
                }
                Err(e) => {
                    report.skipped += 1;
                    warn!(session_id = %session.id, container_id, error = %e, "Inspect failed, skipping session");
                }
            }
        }

        Ok(report)
    }

    /// Run `reconcile_once` every `interval` until `shutdown` flips to
    /// `true` or its sender is dropped.
    pub fn spawn_reconciler(
        &self,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match orchestrator.reconcile_once().await {
                            Ok(report) if report.ended > 0 || report.skipped > 0 => {
                                info!(
                                    checked = report.checked,
                                    ended = report.ended,
                                    skipped = report.skipped,
                                    "Reconciliation sweep finished"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "Reconciliation sweep failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Reconciler stopped");
                            break;
                        }
                    }
                }
            }
        })
    }
}
