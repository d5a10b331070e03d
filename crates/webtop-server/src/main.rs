//! Webtop Server: application entry point.

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use webtop_core::repository::SettingsRepository;
use webtop_db::repository::SurrealSettingsRepository;
use webtop_db::{DbManager, run_migrations, seed_initial_data};
use webtop_gateway::PortainerGateway;
use webtop_server::{AppState, ServerConfig, router};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("webtop=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    if let Err(e) = run().await {
        error!(error = %e, "Webtop server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), BoxError> {
    let config = ServerConfig::from_env()?;
    info!("Starting webtop server...");

    let manager = DbManager::connect(&config.db).await?;
    let db = manager.client().clone();
    run_migrations(&db).await?;

    if let Some(seed) = &config.seed {
        seed_initial_data(&db, seed).await?;
    }

    let stored = SurrealSettingsRepository::new(db.clone()).all().await?;
    let gateway_config = config.gateway_config(&stored);
    if gateway_config.api_key.is_empty() {
        warn!("No Portainer API key configured; container calls will be rejected");
    }
    info!(
        portainer_url = %gateway_config.base_url,
        endpoint_id = gateway_config.endpoint_id,
        "Container gateway configured"
    );
    let gateway = PortainerGateway::new(gateway_config)?;

    let state = AppState::new(db, gateway, config.auth.clone(), config.orchestrator.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = state
        .orchestrator
        .spawn_reconciler(config.orchestrator.reconcile_interval, shutdown_rx);

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Webtop server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = reconciler.await {
        warn!(error = %e, "Reconciler task ended abnormally");
    }

    info!("Webtop server stopped.");
    Ok(())
}
