//! Realtime channel connection loop.
//!
//! The [`Viewer`] owns a [`Reconciler`] and keeps it fed:
//!
//! ```text
//! loop:
//!   Connecting --> connect ok --> Connected --> read frames + run animation --> closed
//!        |                                                                       |
//!        +--> connect failed ------------------------------------------------> Disconnected
//!                                                                                |
//!                                       wait reconnect_delay (animation keeps running)
//! ```
//!
//! The delay is fixed and retries never stop. Recovery needs no replay:
//! every new connection begins with a full snapshot.
//!
//! Network frames and animation deadlines are multiplexed on a single
//! task with `tokio::select!`, so the reconciler is never shared.

use std::time::{Duration, Instant};

use futures::StreamExt as _;
use skyscan_types::{ServerMessage, TileId};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::animation::{Animator, DroneEvent};
use crate::config::ViewerConfig;
use crate::reconciler::{ConnectionStatus, Reconciler};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A change the presentation layer should reflect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerUpdate {
    /// The connection indicator changed.
    Status(ConnectionStatus),
    /// A snapshot replaced local state.
    Synced {
        /// Tiles known after the snapshot.
        known: usize,
    },
    /// A tile arrived and is waiting for (or in) its reveal animation.
    Arrived(TileId),
    /// The drone moved through its cycle.
    Drone(DroneEvent),
}

/// Connects to the tile server and drives the reconciler.
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    reconciler: Reconciler,
    updates: Option<mpsc::UnboundedSender<ViewerUpdate>>,
}

impl Viewer {
    /// Create a viewer with empty state.
    pub const fn new(config: ViewerConfig) -> Self {
        let animator = Animator::new(config.scan_duration, config.settle_delay);
        Self {
            config,
            reconciler: Reconciler::new(animator),
            updates: None,
        }
    }

    /// Forward every [`ViewerUpdate`] to `tx` as well as logging it.
    #[must_use]
    pub fn with_updates(mut self, tx: mpsc::UnboundedSender<ViewerUpdate>) -> Self {
        self.updates = Some(tx);
        self
    }

    /// The current local state.
    pub const fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Connect, consume, and reconnect forever.
    pub async fn run(&mut self) {
        loop {
            self.set_status(ConnectionStatus::Connecting);
            match connect_async(self.config.ws_url.as_str()).await {
                Ok((socket, _)) => {
                    info!(url = self.config.ws_url, "connected to tile server");
                    self.set_status(ConnectionStatus::Connected);
                    self.consume(socket).await;
                }
                Err(e) => {
                    warn!(url = self.config.ws_url, error = %e, "connection attempt failed");
                }
            }
            self.set_status(ConnectionStatus::Disconnected);
            info!(
                delay_ms = self.config.reconnect_delay.as_millis(),
                "reconnecting after delay"
            );
            self.animate_for(self.config.reconnect_delay).await;
        }
    }

    /// Read frames until the socket closes, running the animation between
    /// frames.
    async fn consume(&mut self, mut socket: Socket) {
        loop {
            let deadline = self.reconciler.next_deadline();
            tokio::select! {
                frame = socket.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()),
                        Some(Ok(Message::Close(frame))) => {
                            info!(?frame, "server closed the connection");
                            return;
                        }
                        None => {
                            info!("connection closed");
                            return;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "connection error");
                            return;
                        }
                        Some(Ok(_)) => {
                            // Pings are answered by the transport; binary frames are not used.
                        }
                    }
                }
                () = sleep_until(deadline) => self.tick(),
            }
        }
    }

    /// Keep animating for `delay` without a connection.
    async fn animate_for(&mut self, delay: Duration) {
        let wait = tokio::time::sleep(delay);
        tokio::pin!(wait);
        loop {
            let deadline = self.reconciler.next_deadline();
            tokio::select! {
                () = &mut wait => return,
                () = sleep_until(deadline) => self.tick(),
            }
        }
    }

    fn handle_text(&mut self, text: &str) {
        let message = match ServerMessage::from_json(text) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "ignoring undecodable frame");
                return;
            }
        };

        let arrived = match &message {
            ServerMessage::NewTile { tile } => Some(tile.id.clone()),
            ServerMessage::Initial { .. } => None,
        };
        let is_snapshot = arrived.is_none();
        let known_before = self.reconciler.known_count();
        let events = self.reconciler.apply(message, Instant::now());

        if is_snapshot {
            let known = self.reconciler.known_count();
            info!(known, pending = self.reconciler.pending(), "state synchronized from snapshot");
            self.emit(ViewerUpdate::Synced { known });
        } else if let Some(id) = arrived {
            if self.reconciler.known_count() > known_before {
                info!(tile_id = %id, known = self.reconciler.known_count(), "new tile received");
                self.emit(ViewerUpdate::Arrived(id));
            }
        }
        self.report(events);
    }

    fn tick(&mut self) {
        let events = self.reconciler.advance(Instant::now());
        self.report(events);
    }

    fn report(&self, events: Vec<DroneEvent>) {
        for event in events {
            match &event {
                DroneEvent::ScanStarted(id) => {
                    let position = self.reconciler.drone().position;
                    info!(
                        tile_id = %id,
                        lon = position.map(|p| p.lon),
                        lat = position.map(|p| p.lat),
                        pending = self.reconciler.pending(),
                        "drone scanning tile"
                    );
                }
                DroneEvent::Revealed(id) => {
                    info!(
                        tile_id = %id,
                        revealed = self.reconciler.revealed_count(),
                        known = self.reconciler.known_count(),
                        "tile revealed"
                    );
                }
                DroneEvent::Cancelled(id) => debug!(tile_id = %id, "scan superseded by snapshot"),
                DroneEvent::QueueDrained => debug!("drone idle"),
            }
            self.emit(ViewerUpdate::Drone(event));
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.reconciler.set_status(status) {
            debug!(?status, "connection status changed");
            self.emit(ViewerUpdate::Status(status));
        }
    }

    fn emit(&self, update: ViewerUpdate) {
        if let Some(tx) = &self.updates {
            let _ = tx.send(update);
        }
    }
}

/// Sleep until `deadline`, or forever if there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending::<()>().await,
    }
}
