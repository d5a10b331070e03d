//! Portainer Docker-proxy client.
//!
//! Every call goes to `{base}/endpoints/{id}/docker/containers/...` with
//! the API key in `x-api-key`. Transport failures and timeouts become
//! `GatewayError::Unavailable`; non-success statuses become `Rejected`.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use webtop_core::error::{WebtopError, WebtopResult};
use webtop_core::gateway::{
    ContainerGateway, ContainerSpec, ContainerStatus, GatewayError, StopOutcome,
};

use crate::config::GatewayConfig;

const API_KEY_HEADER: &str = "x-api-key";
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateContainerBody<'a> {
    image: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    env: &'a [String],
    labels: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct CreateContainerResponse {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Deserialize)]
struct InspectResponse {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "State")]
    state: InspectState,
}

#[derive(Deserialize)]
struct InspectState {
    #[serde(rename = "Running", default)]
    running: bool,
    #[serde(rename = "Status", default)]
    status: String,
}

/// `ContainerGateway` backed by Portainer's Docker proxy.
#[derive(Clone)]
pub struct PortainerGateway {
    client: Client,
    config: GatewayConfig,
    docker_base: String,
}

impl PortainerGateway {
    pub fn new(config: GatewayConfig) -> WebtopResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WebtopError::Internal(format!("failed to build HTTP client: {e}")))?;
        let docker_base = config.docker_base();
        Ok(Self {
            client,
            config,
            docker_base,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn container_url(&self, container_id: &str, action: &str) -> String {
        if action.is_empty() {
            format!("{}/containers/{}", self.docker_base, container_id)
        } else {
            format!("{}/containers/{}/{}", self.docker_base, container_id, action)
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(API_KEY_HEADER, &self.config.api_key)
    }

    async fn send(&self, request: RequestBuilder, op: &'static str) -> Result<Response, GatewayError> {
        self.authorized(request).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("{op} timed out")
            } else {
                format!("{op} failed: {e}")
            };
            warn!(op, error = %e, "Container platform unreachable");
            GatewayError::Unavailable { reason }
        })
    }
}

/// Consume a non-success response into `Rejected`.
async fn rejected(response: Response) -> GatewayError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    GatewayError::Rejected {
        status,
        body: truncate(&body, MAX_ERROR_BODY),
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn protocol(op: &str, err: reqwest::Error) -> GatewayError {
    GatewayError::Protocol(format!("{op}: {err}"))
}

impl ContainerGateway for PortainerGateway {
    async fn create(&self, spec: &ContainerSpec) -> Result<String, GatewayError> {
        let name = self.config.container_name(&spec.name);
        let mut labels = self.config.extra_labels.clone();
        labels.extend(spec.labels.iter().map(|(k, v)| (k.clone(), v.clone())));

        let body = CreateContainerBody {
            image: &spec.image,
            env: &spec.env,
            labels,
        };
        let request = self
            .client
            .post(format!("{}/containers/create", self.docker_base))
            .query(&[("name", name.as_str())])
            .json(&body);

        let response = self.send(request, "create").await?;
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let created: CreateContainerResponse =
            response.json().await.map_err(|e| protocol("create", e))?;

        debug!(container_id = %created.id, container_name = %name, "Container created");
        Ok(created.id)
    }

    async fn start(&self, container_id: &str) -> Result<(), GatewayError> {
        let request = self.client.post(self.container_url(container_id, "start"));
        let response = self.send(request, "start").await?;
        // 304: already running.
        if response.status().is_success() || response.status() == StatusCode::NOT_MODIFIED {
            debug!(container_id, "Container started");
            return Ok(());
        }
        Err(rejected(response).await)
    }

    async fn stop(&self, container_id: &str) -> Result<StopOutcome, GatewayError> {
        let grace = self.config.stop_grace_secs;
        let request = self
            .client
            .post(self.container_url(container_id, "stop"))
            .query(&[("t", grace)])
            .timeout(self.config.request_timeout + Duration::from_secs(u64::from(grace)));

        let response = self.send(request, "stop").await?;
        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(StopOutcome::AlreadyStopped),
            StatusCode::NOT_FOUND => Ok(StopOutcome::Gone),
            s if s.is_success() => Ok(StopOutcome::Stopped),
            _ => Err(rejected(response).await),
        }
    }

    async fn remove(&self, container_id: &str) -> Result<(), GatewayError> {
        let request = self
            .client
            .delete(self.container_url(container_id, ""))
            .query(&[("force", "true")]);
        let response = self.send(request, "remove").await?;
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            debug!(container_id, "Container removed");
            return Ok(());
        }
        Err(rejected(response).await)
    }

    async fn inspect(&self, container_id: &str) -> Result<Option<ContainerStatus>, GatewayError> {
        let request = self.client.get(self.container_url(container_id, "json"));
        let response = self.send(request, "inspect").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        let body: InspectResponse = response.json().await.map_err(|e| protocol("inspect", e))?;
        Ok(Some(ContainerStatus {
            id: body.id,
            running: body.state.running,
            state: body.state.status,
        }))
    }
}
