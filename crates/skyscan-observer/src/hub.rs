//! The broadcast hub: registry ownership and fan-out to sessions.
//!
//! [`TileHub`] pairs the [`TileRegistry`] with a bounded
//! [`broadcast`] channel. The ordering guarantees come from one rule:
//!
//! - [`TileHub::register`] holds the registry **write** lock across both
//!   the insert and the broadcast send.
//! - [`TileHub::join`] holds the **read** lock across both the snapshot
//!   copy and the subscribe.
//!
//! A registration therefore lands entirely before a join (in the
//! snapshot, not on the receiver) or entirely after it (on the receiver,
//! not in the snapshot). No gap, no duplicate.
//!
//! # Slow subscribers
//!
//! Each session's receiver buffers at most `capacity` undelivered tiles.
//! A session that falls further behind observes [`SessionEnd::Lagged`]
//! and is disconnected; the viewer's reconnect loop resyncs it from a
//! fresh snapshot.

use skyscan_core::registry::TileRegistry;
use skyscan_core::watcher::TileReady;
use skyscan_types::{ServerMessage, SessionId, TileId, TileMetadata, TileRecord};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info};

/// Why a session stopped receiving change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionEnd {
    /// The session's buffer overflowed and this many events were lost.
    #[error("session lagged by {0} events")]
    Lagged(u64),
    /// The hub was dropped.
    #[error("hub closed")]
    HubClosed,
}

/// One subscriber's view of the hub.
#[derive(Debug)]
pub struct Session {
    /// Identifier used in logs.
    pub id: SessionId,
    /// The snapshot message to send before anything else.
    pub initial: ServerMessage,
    events: broadcast::Receiver<TileRecord>,
}

impl Session {
    /// Wait for the next registration, as a `new_tile` message.
    ///
    /// # Errors
    ///
    /// Returns [`SessionEnd`] once the session can no longer be served in
    /// order.
    pub async fn next_change(&mut self) -> Result<ServerMessage, SessionEnd> {
        match self.events.recv().await {
            Ok(tile) => Ok(ServerMessage::NewTile { tile }),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(SessionEnd::Lagged(n)),
            Err(broadcast::error::RecvError::Closed) => Err(SessionEnd::HubClosed),
        }
    }
}

/// Owner of the tile registry and the session broadcast set.
#[derive(Debug)]
pub struct TileHub {
    registry: RwLock<TileRegistry>,
    tx: broadcast::Sender<TileRecord>,
}

impl TileHub {
    /// Create a hub around `registry`, buffering at most `capacity`
    /// undelivered tiles per session.
    pub fn new(registry: TileRegistry, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            registry: RwLock::new(registry),
            tx,
        }
    }

    /// Open a session: snapshot plus a receiver for every later tile.
    pub async fn join(&self) -> Session {
        let registry = self.registry.read().await;
        let events = self.tx.subscribe();
        let initial = ServerMessage::Initial {
            tiles: registry.snapshot(),
            tile_render_base_url: registry.render_base_url().to_owned(),
        };
        Session {
            id: SessionId::new(),
            initial,
            events,
        }
    }

    /// Register a tile and broadcast it to every open session.
    ///
    /// Returns `None` if the id was already registered; nothing is sent
    /// in that case.
    pub async fn register(&self, id: TileId, metadata: TileMetadata) -> Option<TileRecord> {
        let mut registry = self.registry.write().await;
        let record = registry.register(id, metadata)?;
        // send fails only when no session is connected, which is normal.
        let receivers = self.tx.send(record.clone()).unwrap_or(0);
        info!(
            tile_id = %record.id,
            row = record.metadata.row,
            col = record.metadata.col,
            total = registry.len(),
            receivers,
            "tile registered"
        );
        Some(record)
    }

    /// Drain tile-ready notifications into the registry until the sender
    /// side closes. This loop is the registry's single writer.
    pub async fn ingest(&self, mut ready: mpsc::Receiver<TileReady>) {
        while let Some(TileReady { id, metadata }) = ready.recv().await {
            if self.register(id.clone(), metadata).await.is_none() {
                debug!(tile_id = %id, "duplicate tile ignored");
            }
        }
        info!("tile source closed, ingest loop finished");
    }

    /// All registered tiles in arrival order.
    pub async fn tiles(&self) -> Vec<TileRecord> {
        self.registry.read().await.snapshot()
    }

    /// Look up one tile.
    pub async fn tile(&self, id: &TileId) -> Option<TileRecord> {
        self.registry.read().await.get(id).cloned()
    }

    /// Number of registered tiles.
    pub async fn tile_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// The rendering service base URL.
    pub async fn render_base_url(&self) -> String {
        self.registry.read().await.render_base_url().to_owned()
    }

    /// Number of sessions currently subscribed.
    pub fn session_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
