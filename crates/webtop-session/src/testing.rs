//! In-memory `ContainerGateway` for tests.
//!
//! Records every call in order and keeps a small model of container
//! state so stop/inspect answer the way the platform would. Any
//! operation can be scripted to fail.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use webtop_core::gateway::{
    ContainerGateway, ContainerSpec, ContainerStatus, GatewayError, StopOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    Create,
    Start,
    Stop,
    Remove,
    Inspect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Create(ContainerSpec),
    Start(String),
    Stop(String),
    Remove(String),
    Inspect(String),
}

impl GatewayCall {
    pub fn op(&self) -> GatewayOp {
        match self {
            Self::Create(_) => GatewayOp::Create,
            Self::Start(_) => GatewayOp::Start,
            Self::Stop(_) => GatewayOp::Stop,
            Self::Remove(_) => GatewayOp::Remove,
            Self::Inspect(_) => GatewayOp::Inspect,
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<GatewayCall>,
    /// container id -> running
    containers: HashMap<String, bool>,
    next_ids: VecDeque<String>,
    counter: usize,
    failures: HashMap<GatewayOp, GatewayError>,
    stop_delay: Option<Duration>,
}

/// Cloning shares the same recorded state.
#[derive(Clone, Default)]
pub struct RecordingGateway {
    state: Arc<Mutex<State>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Id handed out by the next `create`; later creates use `c<n>`.
    pub fn with_next_id(self, id: impl Into<String>) -> Self {
        self.state().next_ids.push_back(id.into());
        self
    }

    /// Make every call of `op` fail with `error` until cleared.
    pub fn fail(&self, op: GatewayOp, error: GatewayError) {
        self.state().failures.insert(op, error);
    }

    pub fn clear_failure(&self, op: GatewayOp) {
        self.state().failures.remove(&op);
    }

    /// Delay each `stop` call, to hold concurrent callers in flight.
    pub fn set_stop_delay(&self, delay: Duration) {
        self.state().stop_delay = Some(delay);
    }

    /// Simulate an out-of-band deletion.
    pub fn forget(&self, container_id: &str) {
        self.state().containers.remove(container_id);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state().calls.clone()
    }

    pub fn count(&self, op: GatewayOp) -> usize {
        self.state().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn is_running(&self, container_id: &str) -> bool {
        self.state().containers.get(container_id).copied().unwrap_or(false)
    }

    pub fn exists(&self, container_id: &str) -> bool {
        self.state().containers.contains_key(container_id)
    }

    fn record(&self, call: GatewayCall) -> Result<(), GatewayError> {
        let op = call.op();
        let mut state = self.state();
        state.calls.push(call);
        match state.failures.get(&op) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl ContainerGateway for RecordingGateway {
    async fn create(&self, spec: &ContainerSpec) -> Result<String, GatewayError> {
        self.record(GatewayCall::Create(spec.clone()))?;
        let mut state = self.state();
        state.counter += 1;
        let id = match state.next_ids.pop_front() {
            Some(id) => id,
            None => format!("c{}", state.counter),
        };
        state.containers.insert(id.clone(), false);
        Ok(id)
    }

    async fn start(&self, container_id: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::Start(container_id.to_string()))?;
        match self.state().containers.get_mut(container_id) {
            Some(running) => {
                *running = true;
                Ok(())
            }
            None => Err(GatewayError::Rejected {
                status: 404,
                body: format!("No such container: {container_id}"),
            }),
        }
    }

    async fn stop(&self, container_id: &str) -> Result<StopOutcome, GatewayError> {
        self.record(GatewayCall::Stop(container_id.to_string()))?;
        let delay = self.state().stop_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state();
        Ok(match state.containers.get_mut(container_id) {
            Some(running) if *running => {
                *running = false;
                StopOutcome::Stopped
            }
            Some(_) => StopOutcome::AlreadyStopped,
            None => StopOutcome::Gone,
        })
    }

    async fn remove(&self, container_id: &str) -> Result<(), GatewayError> {
        self.record(GatewayCall::Remove(container_id.to_string()))?;
        self.state().containers.remove(container_id);
        Ok(())
    }

    async fn inspect(&self, container_id: &str) -> Result<Option<ContainerStatus>, GatewayError> {
        self.record(GatewayCall::Inspect(container_id.to_string()))?;
        Ok(self
            .state()
            .containers
            .get(container_id)
            .map(|running| ContainerStatus {
                id: container_id.to_string(),
                running: *running,
                state: if *running { "running" } else { "exited" }.to_string(),
            }))
    }
}
