//! Server configuration.
//!
//! Loaded once at startup with priority: env var > settings table >
//! default. `.env` is read via dotenvy, which never overwrites variables
//! already set in the process environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use webtop_auth::AuthConfig;
use webtop_core::models::setting::{PORTAINER_API_KEY_KEY, PORTAINER_URL_KEY, Setting};
use webtop_db::{DbConfig, DbCredentials, SeedOptions};
use webtop_gateway::GatewayConfig;
use webtop_session::OrchestratorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {key}")]
    Missing { key: &'static str },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub orchestrator: OrchestratorConfig,
    /// Gateway settings with defaults; Portainer URL and key are resolved
    /// by [`ServerConfig::gateway_config`].
    pub gateway: GatewayConfig,
    portainer_url: Option<String>,
    portainer_api_key: Option<String>,
    /// `Some` when `SEED=true`.
    pub seed: Option<SeedOptions>,
}

impl ServerConfig {
    /// Load `.env`, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let jwt_secret = env.get("JWT_SECRET").ok_or(ConfigError::Missing { key: "JWT_SECRET" })?;
        let auth_defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_secret,
            jwt_issuer: env.get("JWT_ISSUER").unwrap_or(auth_defaults.jwt_issuer),
            access_token_lifetime_secs: env
                .parse("TOKEN_LIFETIME_SECS")?
                .unwrap_or(auth_defaults.access_token_lifetime_secs),
            pepper: env.get("PASSWORD_PEPPER"),
            min_password_length: auth_defaults.min_password_length,
        };

        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: env.get("DATABASE_URL").unwrap_or(db_defaults.url),
            namespace: env.get("DATABASE_NS").unwrap_or(db_defaults.namespace),
            database: env.get("DATABASE_DB").unwrap_or(db_defaults.database),
            credentials: match (env.get("DATABASE_USER"), env.get("DATABASE_PASS")) {
                (Some(username), Some(password)) => Some(DbCredentials { username, password }),
                (None, None) => None,
                (Some(_), None) => return Err(ConfigError::Missing { key: "DATABASE_PASS" }),
                (None, Some(_)) => return Err(ConfigError::Missing { key: "DATABASE_USER" }),
            },
        };
        db.engine().map_err(|e| ConfigError::Invalid {
            key: "DATABASE_URL",
            message: e.to_string(),
        })?;

        let gateway_defaults = GatewayConfig::default();
        let gateway = GatewayConfig {
            endpoint_id: env
                .parse("PORTAINER_ENDPOINT_ID")?
                .unwrap_or(gateway_defaults.endpoint_id),
            request_timeout: env
                .parse("GATEWAY_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(gateway_defaults.request_timeout),
            ..gateway_defaults
        };

        let orchestrator_defaults = OrchestratorConfig::default();
        let orchestrator = OrchestratorConfig {
            public_base_url: env
                .get("PUBLIC_BASE_URL")
                .unwrap_or(orchestrator_defaults.public_base_url),
            reconcile_interval: env
                .parse("RECONCILE_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(orchestrator_defaults.reconcile_interval),
            ..orchestrator_defaults
        };
        if orchestrator.reconcile_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "RECONCILE_INTERVAL_SECS",
                message: "must be greater than zero".into(),
            });
        }

        let seed = if env.parse::<bool>("SEED")?.unwrap_or(false) {
            Some(SeedOptions {
                admin_password: env
                    .get("SEED_ADMIN_PASSWORD")
                    .ok_or(ConfigError::Missing { key: "SEED_ADMIN_PASSWORD" })?,
                user_password: env
                    .get("SEED_USER_PASSWORD")
                    .ok_or(ConfigError::Missing { key: "SEED_USER_PASSWORD" })?,
                pepper: auth.pepper.clone(),
            })
        } else {
            None
        };

        Ok(Self {
            bind_addr: env
                .parse("WEBTOP_BIND")?
                .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080))),
            db,
            auth,
            orchestrator,
            gateway,
            portainer_url: env.get("PORTAINER_URL"),
            portainer_api_key: env.get("PORTAINER_API_KEY"),
            seed,
        })
    }

    /// Gateway config with the Portainer URL and API key taken from the
    /// environment, else from non-empty stored settings, else defaults.
    pub fn gateway_config(&self, stored: &[Setting]) -> GatewayConfig {
        let stored_value = |key: &str| {
            stored
                .iter()
                .find(|s| s.key == key && !s.value.trim().is_empty())
                .map(|s| s.value.clone())
        };

        let mut config = self.gateway.clone();
        if let Some(url) = self
            .portainer_url
            .clone()
            .or_else(|| stored_value(PORTAINER_URL_KEY))
        {
            config.base_url = url;
        }
        if let Some(key) = self
            .portainer_api_key
            .clone()
            .or_else(|| stored_value(PORTAINER_API_KEY_KEY))
        {
            config.api_key = key;
        }
        config
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                    key,
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}
