//! REST API endpoint handlers for the tile server.
//!
//! All handlers read through the shared [`TileHub`](crate::hub::TileHub);
//! none of them mutate it.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/tiles` | List all tiles in arrival order |
//! | `GET` | `/api/tiles/:id` | Get a single tile |
//! | `GET` | `/api/config` | Rendering service and realtime channel addresses |
//! | `GET` | `/health` | Liveness, tile count, and uptime |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::HOST;
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse};
use axum::Json;
use skyscan_types::{TileId, TileRecord};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let tile_count = state.hub.tile_count().await;
    let session_count = state.hub.session_count();
    let uptime = state.uptime_seconds();
    let render_url = state.hub.render_base_url().await;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>SkyScan</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>SkyScan</h1>
    <p class="subtitle">Live drone tile notifications</p>

    <p>Status: <span class="status">RUNNING</span></p>

    <div>
        <div class="metric">
            <div class="label">Tiles</div>
            <div class="value">{tile_count}</div>
        </div>
        <div class="metric">
            <div class="label">Viewers</div>
            <div class="value">{session_count}</div>
        </div>
        <div class="metric">
            <div class="label">Uptime (s)</div>
            <div class="value">{uptime}</div>
        </div>
    </div>

    <p class="subtitle">Rendering service: {render_url}</p>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/tiles">/api/tiles</a> -- All tiles in arrival order</li>
        <li><a href="/api/tiles/:id">/api/tiles/:id</a> -- Single tile</li>
        <li><a href="/api/config">/api/config</a> -- Client configuration</li>
        <li><a href="/health">/health</a> -- Liveness check</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li style="list-style:none;"><code>ws://host:port/ws</code> -- Snapshot, then one message per new tile</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/tiles -- list tiles
// ---------------------------------------------------------------------------

/// List every registered tile in arrival order.
pub async fn list_tiles(State(state): State<Arc<AppState>>) -> Json<Vec<TileRecord>> {
    Json(state.hub.tiles().await)
}

// ---------------------------------------------------------------------------
// GET /api/tiles/:id -- single tile
// ---------------------------------------------------------------------------

/// Get one tile by id.
///
/// # Errors
///
/// Returns [`ObserverError::NotFound`] (HTTP 404) if no tile with that id
/// has been registered.
pub async fn get_tile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TileRecord>, ObserverError> {
    let id = TileId::from(id);
    state
        .hub
        .tile(&id)
        .await
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound(format!("tile {id} not found")))
}

// ---------------------------------------------------------------------------
// GET /health -- liveness
// ---------------------------------------------------------------------------

/// Report liveness, the registered tile count, and uptime.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "tiles": state.hub.tile_count().await,
        "sessions": state.hub.session_count(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/config -- client configuration
// ---------------------------------------------------------------------------

/// Return the rendering service URL and the realtime channel address.
///
/// The realtime address comes from configuration when set; otherwise it
/// is built from the request's `Host` header.
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let ws_url = state.public_ws_url.clone().unwrap_or_else(|| {
        let host = headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost:8080");
        format!("ws://{host}/ws")
    });

    Json(serde_json::json!({
        "tileRenderBaseUrl": state.hub.render_base_url().await,
        "wsUrl": ws_url,
    }))
}
