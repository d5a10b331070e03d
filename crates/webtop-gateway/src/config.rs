//! Gateway configuration.

use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Portainer API root, e.g. `http://portainer:9000/api`.
    pub base_url: String,
    /// Sent as `x-api-key`. Never logged.
    pub api_key: String,
    /// Portainer environment (endpoint) that hosts session containers.
    pub endpoint_id: u32,
    /// Upper bound for every request; exceeding it is `Unavailable`.
    pub request_timeout: Duration,
    /// Seconds Docker waits before killing a container on stop.
    pub stop_grace_secs: u32,
    /// Container names are `<prefix>-<name>`.
    pub container_name_prefix: String,
    /// Labels added to every created container.
    pub extra_labels: BTreeMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/api".into(),
            api_key: String::new(),
            endpoint_id: 1,
            request_timeout: Duration::from_secs(30),
            stop_grace_secs: 10,
            container_name_prefix: "webtop".into(),
            extra_labels: BTreeMap::new(),
        }
    }
}

impl GatewayConfig {
    /// Base of the Docker proxy for the configured endpoint.
    pub fn docker_base(&self) -> String {
        format!(
            "{}/endpoints/{}/docker",
            self.base_url.trim_end_matches('/'),
            self.endpoint_id
        )
    }

    pub fn container_name(&self, name: &str) -> String {
        if self.container_name_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}-{}", self.container_name_prefix, name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_base_strips_trailing_slash() {
        let config = GatewayConfig {
            base_url: "http://portainer:9000/api/".into(),
            endpoint_id: 3,
            ..Default::default()
        };
        assert_eq!(config.docker_base(), "http://portainer:9000/api/endpoints/3/docker");
    }

    #[test]
    fn container_name_uses_prefix() {
        let config = GatewayConfig::default();
        assert_eq!(config.container_name("abc"), "webtop-abc");

        let bare = GatewayConfig {
            container_name_prefix: String::new(),
            ..Default::default()
        };
        assert_eq!(bare.container_name("abc"), "abc");
    }
}
