//! Axum router construction for the tile API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled so the map widget can be served from
//! another origin.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the tile server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- `WebSocket` tile channel
/// - `GET /health` -- liveness check
/// - `GET /api/config` -- client configuration
/// - `GET /api/tiles` -- list tiles
/// - `GET /api/tiles/:id` -- single tile
///
/// CORS allows any origin. Authentication is out of scope.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_tiles))
        // REST API
        .route("/health", get(handlers::health))
        .route("/api/config", get(handlers::get_config))
        .route("/api/tiles", get(handlers::list_tiles))
        .route("/api/tiles/{id}", get(handlers::get_tile))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
