//! `WebSocket` handler for the realtime tile channel.
//!
//! Clients connect to `GET /ws`. Each connection joins the [`TileHub`],
//! receives one `initial` snapshot frame, then one `new_tile` frame per
//! registration, as JSON text.
//!
//! A failed send ends the session, which drops its receiver and removes
//! it from the broadcast set. A session that lags behind the hub's
//! buffer is closed with code 1013 so the viewer reconnects and resyncs
//! from a fresh snapshot instead of silently missing tiles.
//!
//! [`TileHub`]: crate::hub::TileHub

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use skyscan_types::ServerMessage;
use tracing::{debug, warn};

use crate::hub::SessionEnd;
use crate::state::AppState;

/// Close code sent to lagging sessions ("try again later").
const CLOSE_TRY_AGAIN: u16 = 1013;

/// Upgrade an HTTP request to a `WebSocket` session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_tiles(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the session lifecycle: snapshot first, then change events.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut session = state.hub.join().await;
    let session_id = session.id;
    debug!(session = %session_id, sessions = state.hub.session_count(), "WebSocket session opened");

    if send_message(&mut socket, &session.initial).await.is_err() {
        debug!(session = %session_id, "WebSocket client disconnected before snapshot");
        return;
    }

    loop {
        tokio::select! {
            change = session.next_change() => {
                match change {
                    Ok(message) => {
                        if send_message(&mut socket, &message).await.is_err() {
                            debug!(session = %session_id, "WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(SessionEnd::Lagged(skipped)) => {
                        warn!(session = %session_id, skipped, "session lagged, closing for resync");
                        let frame = CloseFrame {
                            code: CLOSE_TRY_AGAIN,
                            reason: "lagged, reconnect to resync".into(),
                        };
                        let _ = socket.send(Message::Close(Some(frame))).await;
                        return;
                    }
                    Err(SessionEnd::HubClosed) => {
                        debug!(session = %session_id, "hub closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            // Check if the client sent a close frame or disconnected.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(session = %session_id, "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(session = %session_id, "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(session = %session_id, "WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // The channel is server-to-client only.
                    }
                }
            }
        }
    }
}

/// Encode and send one message. Serialization failures are logged and
/// treated as delivered; only transport failures end the session.
async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = match message.to_json() {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize server message: {e}");
            return Ok(());
        }
    };
    socket.send(Message::Text(json.into())).await
}
