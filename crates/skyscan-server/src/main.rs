//! SkyScan server binary.
//!
//! Wires the artifact store watcher, the tile hub, and the HTTP API
//! together and runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `skyscan-config.yaml` (or `SKYSCAN_CONFIG`)
//! 3. Create the tile registry and hub
//! 4. Attach the watcher, scan existing tiles, start live watching
//! 5. Start the ingest loop (single registry writer)
//! 6. Serve HTTP + `WebSocket` until shutdown

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use skyscan_core::registry::TileRegistry;
use skyscan_core::watcher::TileWatcher;
use skyscan_core::SkyscanConfig;
use skyscan_observer::{AppState, ServerConfig, TileHub};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::ServerAppError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "skyscan-config.yaml";

/// Application entry point for the tile server.
///
/// # Errors
///
/// Returns an error if configuration, the watcher, or the HTTP server
/// fails to start.
#[tokio::main]
async fn main() -> Result<(), ServerAppError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("skyscan-server starting");

    // 2. Load configuration.
    let config_path = std::env::var("SKYSCAN_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = SkyscanConfig::load_or_default(&config_path)?;
    info!(
        config_path = %config_path.display(),
        store_dir = %config.store.dir.display(),
        raster_extension = config.store.raster_extension,
        render_base_url = config.render.base_url,
        quiescence_ms = config.watcher.quiescence_ms,
        "Configuration loaded"
    );

    // 3. Create the registry and hub.
    let registry = TileRegistry::new(
        config.render.base_url.clone(),
        config.store.raster_uri_prefix.clone(),
    );
    let hub = Arc::new(TileHub::new(registry, config.broadcast.capacity));

    // 4. Start the watcher (startup scan happens synchronously here).
    let (ready_tx, ready_rx) = mpsc::channel(config.watcher.ready_capacity.max(1));
    let watcher = TileWatcher::new(
        config.store.dir.clone(),
        config.store.raster_extension.clone(),
        config.watcher.clone(),
    );
    let watcher_handle = watcher.spawn(ready_tx)?;

    // 5. Start the ingest loop.
    let ingest_hub = Arc::clone(&hub);
    let ingest_handle = tokio::spawn(async move { ingest_hub.ingest(ready_rx).await });

    // 6. Serve until Ctrl-C.
    let state = Arc::new(AppState::new(Arc::clone(&hub)).with_public_ws_url(config.http.public_ws_url.clone()));
    let server_config = ServerConfig {
        host: config.http.host.clone(),
        port: config.http.port,
    };
    let result = skyscan_observer::start_server(&server_config, state, shutdown_signal()).await;

    watcher_handle.abort();
    ingest_handle.abort();
    info!(tiles = hub.tile_count().await, "skyscan-server stopped");

    result.map_err(ServerAppError::from)
}

/// Resolve when the process receives `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
