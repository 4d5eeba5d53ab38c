//! SkyScan viewer binary.
//!
//! Runs the connection loop until `Ctrl-C`, logging connection status,
//! tile arrivals, and drone movements.

use skyscan_viewer::{Viewer, ViewerConfig, ViewerError};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point for the viewer.
///
/// # Errors
///
/// Returns an error if the configuration is invalid.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ViewerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = ViewerConfig::from_env()?;
    info!(
        ws_url = config.ws_url,
        reconnect_delay_ms = config.reconnect_delay.as_millis(),
        scan_duration_ms = config.scan_duration.as_millis(),
        settle_delay_ms = config.settle_delay.as_millis(),
        "skyscan-viewer starting"
    );

    let mut viewer = Viewer::new(config);
    tokio::select! {
        () = viewer.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            }
        }
    }

    let state = viewer.reconciler();
    info!(
        known = state.known_count(),
        revealed = state.revealed_count(),
        "skyscan-viewer stopped"
    );
    Ok(())
}
