//! Configuration types for the viewer.
//!
//! All configuration is loaded from environment variables, with defaults
//! that match a server running locally on port 8080.

use std::time::Duration;

use crate::error::ViewerError;

/// Complete viewer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Realtime channel address (e.g. `ws://localhost:8080/ws`).
    pub ws_url: String,
    /// Fixed wait between connection attempts.
    pub reconnect_delay: Duration,
    /// How long the drone scans each tile.
    pub scan_duration: Duration,
    /// Pause after a reveal before the next tile is dequeued.
    pub settle_delay: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            ws_url: String::from("ws://localhost:8080/ws"),
            reconnect_delay: Duration::from_millis(2000),
            scan_duration: Duration::from_millis(2000),
            settle_delay: Duration::from_millis(500),
        }
    }
}

impl ViewerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `SKYSCAN_WS_URL` -- realtime channel address (default `ws://localhost:8080/ws`)
    /// - `RECONNECT_DELAY_MS` -- wait between attempts (default 2000)
    /// - `SCAN_DURATION_MS` -- scan time per tile (default 2000)
    /// - `SETTLE_DELAY_MS` -- pause between tiles (default 500)
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Config`] if a variable is set but unusable.
    pub fn from_env() -> Result<Self, ViewerError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Config`] for a non-numeric duration or a
    /// non-`ws` URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ViewerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |var: &str, default: Duration| -> Result<Duration, ViewerError> {
            lookup(var).map_or(Ok(default), |val| {
                val.parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|e| ViewerError::Config(format!("invalid {var}: {e}")))
            })
        };

        let ws_url = lookup("SKYSCAN_WS_URL").unwrap_or(defaults.ws_url);
        if !(ws_url.starts_with("ws://") || ws_url.starts_with("wss://")) {
            return Err(ViewerError::Config(format!(
                "SKYSCAN_WS_URL must start with ws:// or wss://, got {ws_url}"
            )));
        }

        Ok(Self {
            ws_url,
            reconnect_delay: millis("RECONNECT_DELAY_MS", defaults.reconnect_delay)?,
            scan_duration: millis("SCAN_DURATION_MS", defaults.scan_duration)?,
            settle_delay: millis("SETTLE_DELAY_MS", defaults.settle_delay)?,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let config = ViewerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.reconnect_delay, Duration::from_secs(2));
    }

    #[test]
    fn overrides_apply() {
        let config = ViewerConfig::from_lookup(|var| match var {
            "SKYSCAN_WS_URL" => Some("wss://maps.example/ws".to_owned()),
            "SCAN_DURATION_MS" => Some("750".to_owned()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.ws_url, "wss://maps.example/ws");
        assert_eq!(config.scan_duration, Duration::from_millis(750));
        assert_eq!(config.settle_delay, Duration::from_millis(500));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_delay =
            ViewerConfig::from_lookup(|var| (var == "RECONNECT_DELAY_MS").then(|| "soon".to_owned()));
        assert!(matches!(bad_delay, Err(ViewerError::Config(_))));

        let bad_url =
            ViewerConfig::from_lookup(|var| (var == "SKYSCAN_WS_URL").then(|| "http://x".to_owned()));
        assert!(matches!(bad_url, Err(ViewerError::Config(_))));
    }
}
