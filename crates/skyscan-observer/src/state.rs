//! Shared application state for the tile API server.
//!
//! [`AppState`] holds the [`TileHub`] plus the few settings the HTTP
//! handlers need. It is wrapped in [`Arc`] and injected via Axum's `State`
//! extractor; nothing in the server reaches the hub through a global.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::hub::TileHub;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The registry owner and session broadcaster.
    pub hub: Arc<TileHub>,
    /// When the server started, for the uptime report.
    pub started_at: DateTime<Utc>,
    /// Realtime channel address advertised to clients. Derived from the
    /// request `Host` header when `None`.
    pub public_ws_url: Option<String>,
}

impl AppState {
    /// Create application state around an existing hub.
    pub fn new(hub: Arc<TileHub>) -> Self {
        Self {
            hub,
            started_at: Utc::now(),
            public_ws_url: None,
        }
    }

    /// Advertise a fixed realtime channel address.
    #[must_use]
    pub fn with_public_ws_url(mut self, url: Option<String>) -> Self {
        self.public_ws_url = url;
        self
    }

    /// Whole seconds since the server started.
    pub fn uptime_seconds(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
            .max(0)
    }
}
