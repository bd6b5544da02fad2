//! swap-router server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints and the
//! background sweeper for expired reserves.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use swap_router::api;
use swap_router::app_state::AppState;
use swap_router::config::RouterConfig;
use swap_router::service::PoolDataService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RouterConfig::from_env().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(
        addr = %config.listen_addr,
        network = config.network.name(),
        chain_id = config.network.chain_id(),
        "starting swap-router"
    );

    // Build application state
    let app_state = AppState::from_config(&config)?;

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(sweep_expired(
        Arc::clone(&app_state.pool_data),
        Duration::from_secs(config.cache_sweep_interval_secs.max(1)),
        shutdown.clone(),
    ));

    // Build router
    let app = api::build_app(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown.cancel();
    let _ = sweeper.await;
    tracing::info!("server stopped");

    Ok(())
}

/// Periodically drops expired reserves snapshots until `shutdown` fires.
async fn sweep_expired(
    pool_data: Arc<PoolDataService>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                pool_data.purge_expired().await;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
