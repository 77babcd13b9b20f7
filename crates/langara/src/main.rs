use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use langara::config::AppConfig;
use langara::scheduler::spawn_term_refresh;
use langara::server::create_router;
use langara::types::AppState;
use tracing::{info, warn, Level};

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = AppConfig::load_or_default(&config_path)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
    if !config.log_level.eq_ignore_ascii_case(level.as_str()) {
        warn!(log_level = %config.log_level, "Unknown log level, using info");
    }

    let address = config.bind_address();
    let state = Arc::new(AppState::new(config)?);
    if let Some(period) = state.config.term_refresh_interval() {
        spawn_term_refresh(state.clone(), period);
    }
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!(address = %address, "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
