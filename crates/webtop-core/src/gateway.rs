//! Container platform abstraction.
//!
//! Implemented over HTTP by `webtop-gateway` and in memory by
//! `webtop_session::testing`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure or timeout; the remote outcome is unknown.
    #[error("container platform unavailable: {reason}")]
    Unavailable { reason: String },

    /// The platform answered with a non-success status.
    #[error("container platform rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unexpected container platform response: {0}")]
    Protocol(String),
}

impl GatewayError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Everything needed to create one session container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Result of a stop request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
    /// The platform no longer knows the container.
    Gone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub id: String,
    pub running: bool,
    pub state: String,
}

pub trait ContainerGateway: Send + Sync {
    fn create(
        &self,
        spec: &ContainerSpec,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
    fn start(&self, container_id: &str) -> impl Future<Output = Result<(), GatewayError>> + Send;
    fn stop(
        &self,
        container_id: &str,
    ) -> impl Future<Output = Result<StopOutcome, GatewayError>> + Send;
    /// Force-remove a container. Removing an unknown container succeeds.
    fn remove(&self, container_id: &str)
    -> impl Future<Output = Result<(), GatewayError>> + Send;
    /// `Ok(None)` when the platform reports the container does not exist.
    fn inspect(
        &self,
        container_id: &str,
    ) -> impl Future<Output = Result<Option<ContainerStatus>, GatewayError>> + Send;
}
