//! Client-side tile state reconciliation.
//!
//! The [`Reconciler`] keeps a local mirror of the server registry and
//! decides what the presentation layer may show:
//!
//! - **known**: every tile received, counted immediately.
//! - **revealed**: tiles whose reveal animation has completed, plus every
//!   tile that arrived in a snapshot.
//!
//! An `initial` snapshot replaces all local state, on first connect and
//! after every reconnect alike. Snapshot tiles are pre-revealed, and any
//! in-flight scan or pending animation is cancelled: the snapshot already
//! contains those tiles, so animating them afterwards would reveal them
//! twice.
//!
//! A `new_tile` is counted as known at once and queued for animation; it
//! becomes revealed only when its scan completes.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use skyscan_types::{ServerMessage, TileId, TileRecord};
use tracing::debug;

use crate::animation::{Animator, DroneEvent, DroneState};

/// Connection indicator shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A connection attempt is in progress.
    Connecting,
    /// The realtime channel is open.
    Connected,
    /// The channel is down; a retry is scheduled.
    Disconnected,
}

/// Local tile state plus the reveal animation.
#[derive(Debug)]
pub struct Reconciler {
    known: BTreeMap<TileId, TileRecord>,
    revealed: BTreeSet<TileId>,
    render_base_url: Option<String>,
    status: ConnectionStatus,
    animator: Animator,
}

impl Reconciler {
    /// Start with empty state, disconnected.
    pub const fn new(animator: Animator) -> Self {
        Self {
            known: BTreeMap::new(),
            revealed: BTreeSet::new(),
            render_base_url: None,
            status: ConnectionStatus::Disconnected,
            animator,
        }
    }

    /// Merge one server message into local state.
    pub fn apply(&mut self, message: ServerMessage, now: Instant) -> Vec<DroneEvent> {
        match message {
            ServerMessage::Initial {
                tiles,
                tile_render_base_url,
            } => {
                let events = self.animator.cancel();
                self.revealed = tiles.iter().map(|t| t.id.clone()).collect();
                self.known = tiles.into_iter().map(|t| (t.id.clone(), t)).collect();
                self.render_base_url = Some(tile_render_base_url);
                debug!(tiles = self.known.len(), "snapshot applied");
                events
            }
            ServerMessage::NewTile { tile } => {
                if self.known.contains_key(&tile.id) {
                    debug!(tile_id = %tile.id, "tile already known, ignoring");
                    return Vec::new();
                }
                self.known.insert(tile.id.clone(), tile.clone());
                let events = self.animator.enqueue(tile, now);
                self.absorb(&events);
                events
            }
        }
    }

    /// Run due animation steps and record completed reveals.
    pub fn advance(&mut self, now: Instant) -> Vec<DroneEvent> {
        let events = self.animator.advance(now);
        self.absorb(&events);
        events
    }

    /// When [`advance`](Self::advance) next has work to do.
    pub const fn next_deadline(&self) -> Option<Instant> {
        self.animator.next_deadline()
    }

    /// Update the connection indicator. Returns `true` if it changed.
    pub fn set_status(&mut self, status: ConnectionStatus) -> bool {
        let changed = self.status != status;
        self.status = status;
        changed
    }

    /// The current connection indicator.
    pub const fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Number of tiles received.
    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Number of tiles eligible for display.
    pub fn revealed_count(&self) -> usize {
        self.revealed.len()
    }

    /// Whether `id` may be displayed.
    pub fn is_revealed(&self, id: &TileId) -> bool {
        self.revealed.contains(id)
    }

    /// Tiles eligible for display, ordered by id.
    pub fn revealed_tiles(&self) -> impl Iterator<Item = &TileRecord> {
        self.known
            .iter()
            .filter(|(id, _)| self.revealed.contains(*id))
            .map(|(_, tile)| tile)
    }

    /// Rendering service base URL from the latest snapshot.
    pub fn render_base_url(&self) -> Option<&str> {
        self.render_base_url.as_deref()
    }

    /// The drone as it should be drawn.
    pub const fn drone(&self) -> &DroneState {
        self.animator.drone()
    }

    /// Tiles still waiting for their reveal animation.
    pub fn pending(&self) -> usize {
        self.animator.pending()
    }

    fn absorb(&mut self, events: &[DroneEvent]) {
        for event in events {
            if let DroneEvent::Revealed(id) = event {
                if self.known.contains_key(id) {
                    self.revealed.insert(id.clone());
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use skyscan_types::{LatLonBox, TileMetadata};

    use super::*;

    const SCAN: Duration = Duration::from_millis(2000);
    const SETTLE: Duration = Duration::from_millis(500);

    fn tile(id: &str) -> TileRecord {
        let bbox = LatLonBox([32.99, 17.08, 33.10, 17.18]);
        TileRecord {
            id: TileId::from(id),
            metadata: TileMetadata {
                filename: format!("{id}.tif"),
                row: 0,
                col: 0,
                bounds: bbox.normalize(),
                bbox,
                width: 512,
                height: 512,
            },
            extent: bbox.normalize(),
            tile_url: String::new(),
            info_url: String::new(),
            timestamp: 0,
        }
    }

    fn snapshot(ids: &[&str]) -> ServerMessage {
        ServerMessage::Initial {
            tiles: ids.iter().map(|id| tile(id)).collect(),
            tile_render_base_url: String::from("http://render"),
        }
    }

    fn new_tile(id: &str) -> ServerMessage {
        ServerMessage::NewTile { tile: tile(id) }
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(Animator::new(SCAN, SETTLE))
    }

    fn later(base: Instant, ms: u64) -> Instant {
        base.checked_add(Duration::from_millis(ms)).unwrap()
    }

    #[test]
    fn snapshot_tiles_are_pre_revealed() {
        let mut rec = reconciler();
        let events = rec.apply(snapshot(&["tile_0_0", "tile_0_1"]), Instant::now());

        assert!(events.is_empty());
        assert_eq!(rec.known_count(), 2);
        assert_eq!(rec.revealed_count(), 2);
        assert!(!rec.drone().scanning);
        assert_eq!(rec.render_base_url(), Some("http://render"));
    }

    #[test]
    fn new_tile_is_known_at_once_and_revealed_after_one_cycle() {
        let t0 = Instant::now();
        let mut rec = reconciler();
        rec.apply(snapshot(&["tile_0_0", "tile_0_1"]), t0);

        let events = rec.apply(new_tile("tile_0_2"), t0);
        assert_eq!(events, [DroneEvent::ScanStarted(TileId::from("tile_0_2"))]);
        assert_eq!(rec.known_count(), 3);
        assert_eq!(rec.revealed_count(), 2);
        assert!(!rec.is_revealed(&TileId::from("tile_0_2")));
        assert!(rec.drone().scanning);

        rec.advance(later(t0, 1000));
        assert_eq!(rec.revealed_count(), 2);

        rec.advance(later(t0, 2000));
        assert_eq!(rec.revealed_count(), 3);
        assert!(!rec.drone().scanning);
    }

    #[test]
    fn reconnect_snapshot_clears_stale_scan() {
        let t0 = Instant::now();
        let mut rec = reconciler();
        rec.apply(snapshot(&["tile_0_0"]), t0);
        rec.apply(new_tile("tile_1_0"), t0);
        assert!(rec.drone().scanning);

        // Connection drops mid-scan; the server registers tile_1_1 meanwhile.
        rec.set_status(ConnectionStatus::Disconnected);
        let events = rec.apply(snapshot(&["tile_0_0", "tile_1_0", "tile_1_1"]), later(t0, 500));

        assert_eq!(events, [DroneEvent::Cancelled(TileId::from("tile_1_0"))]);
        assert!(!rec.drone().scanning);
        assert_eq!(rec.next_deadline(), None);
        assert_eq!(rec.known_count(), 3);
        assert_eq!(rec.revealed_count(), 3);
        assert!(rec.is_revealed(&TileId::from("tile_1_0")));

        // The abandoned scan never fires a duplicate reveal.
        assert!(rec.advance(later(t0, 60_000)).is_empty());
    }

    #[test]
    fn snapshot_replaces_state_wholesale() {
        let mut rec = reconciler();
        rec.apply(snapshot(&["tile_0_0", "tile_0_1", "tile_0_2"]), Instant::now());
        rec.apply(snapshot(&["tile_5_5"]), Instant::now());

        assert_eq!(rec.known_count(), 1);
        assert_eq!(rec.revealed_count(), 1);
        assert!(rec.is_revealed(&TileId::from("tile_5_5")));
        assert!(!rec.is_revealed(&TileId::from("tile_0_0")));
    }

    #[test]
    fn queued_tiles_reveal_in_arrival_order() {
        let t0 = Instant::now();
        let mut rec = reconciler();
        rec.apply(snapshot(&[]), t0);
        for id in ["c", "a", "b"] {
            rec.apply(new_tile(id), t0);
        }
        assert_eq!(rec.known_count(), 3);
        assert_eq!(rec.pending(), 2);

        let revealed: Vec<DroneEvent> = rec
            .advance(later(t0, 60_000))
            .into_iter()
            .filter(|e| matches!(e, DroneEvent::Revealed(_)))
            .collect();
        assert_eq!(
            revealed,
            [
                DroneEvent::Revealed(TileId::from("c")),
                DroneEvent::Revealed(TileId::from("a")),
                DroneEvent::Revealed(TileId::from("b")),
            ]
        );
        assert_eq!(rec.revealed_tiles().count(), 3);
    }

    #[test]
    fn duplicate_new_tile_is_ignored() {
        let t0 = Instant::now();
        let mut rec = reconciler();
        rec.apply(snapshot(&["tile_0_0"]), t0);
        assert!(rec.apply(new_tile("tile_0_0"), t0).is_empty());
        assert_eq!(rec.known_count(), 1);
        assert_eq!(rec.pending(), 0);
        assert!(!rec.drone().scanning);
    }

    #[test]
    fn status_changes_are_reported_once() {
        let mut rec = reconciler();
        assert_eq!(rec.status(), ConnectionStatus::Disconnected);
        assert!(rec.set_status(ConnectionStatus::Connecting));
        assert!(rec.set_status(ConnectionStatus::Connected));
        assert!(!rec.set_status(ConnectionStatus::Connected));
    }
}
