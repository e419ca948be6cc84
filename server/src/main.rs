//! Currencies Service Binary

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use currencies_server::config::log_level_for;
use currencies_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env();

    // Initialize logging
    let default_level = match &config {
        Ok(config) => config.log_level.clone(),
        Err(_) => log_level_for(None).to_string(),
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or(default_level),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting currencies service");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(anyhow::anyhow!("Configuration error: {}", e));
        }
    };

    let state = AppState::from_config(&config)?;
    let metrics = state.metrics.clone();

    info!(
        provider = %state.engine.provider_name(),
        assets = state.engine.supported_assets().len(),
        unknown_currency_policy = ?config.unknown_currency_policy,
        error_status = ?config.error_status,
        "Engine ready"
    );

    let app = router(state, config.metrics_enabled);
    let listener = TcpListener::bind(config.bind_address()).await?;

    info!(
        listen_addr = %config.listen_addr,
        listen_port = %config.listen_port,
        "Server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(metrics = ?metrics.snapshot(), "Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
