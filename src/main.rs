//! objcache - An in-process object cache
//!
//! Runs the cache behind a small HTTP admin API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use objcache::api::{create_router, AppState};
use objcache::Config;

/// Main entry point for the objcache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and restore the snapshot, if one is configured
/// 4. Create Axum router with all endpoints
/// 5. Start HTTP server on configured port
/// 6. On SIGINT/SIGTERM save the snapshot and destroy the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "objcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting objcache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_size={}, lifetime={}s, reset_after={:?}, update_interval={}s, port={}",
        config.cache.cache_size,
        config.cache.lifetime.as_secs(),
        config.cache.reset_after,
        config.cache.update_interval_secs,
        config.server_port
    );

    let state = AppState::from_config(&config);
    if let Some(path) = state.snapshot_path.as_ref().filter(|p| p.exists()) {
        match state.cache.load(path) {
            Ok(()) => info!("Restored {} entries from {}", state.cache.len(), path.display()),
            Err(err) => warn!("Could not restore snapshot {}: {}", path.display(), err),
        }
    }

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(path) = state.snapshot_path.as_ref() {
        match state.cache.save(path) {
            Ok(()) => info!("Snapshot written to {}", path.display()),
            Err(err) => warn!("Could not write snapshot {}: {}", path.display(), err),
        }
    }
    state.cache.destroy();

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
