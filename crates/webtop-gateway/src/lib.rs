//! Webtop Gateway: container lifecycle calls against the Portainer
//! Docker-proxy API.

pub mod client;
pub mod config;

pub use client::PortainerGateway;
pub use config::GatewayConfig;
