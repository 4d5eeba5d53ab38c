//! Reveal animation queue and drone state machine.
//!
//! Tiles can arrive in bursts or one at a time; the viewer presents them
//! one at a time, in arrival order:
//!
//! ```text
//!            enqueue                 scan_duration            settle_delay
//! Idle ------------------> Scanning(tile) ---------> Settling ------------> Scanning(next) | Idle
//!                          drone at tile center      tile revealed,
//!                          scanning = true           scanning = false
//! ```
//!
//! At most one tile is ever scanning. Enqueuing never interrupts a scan.
//! [`Animator`] is a pure state machine over caller-supplied instants;
//! the viewer loop sleeps until [`Animator::next_deadline`] and then calls
//! [`Animator::advance`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use skyscan_types::{GeoPoint, TileId, TileRecord};

/// What the drone is doing, as seen by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DroneState {
    /// Current position; `None` until the first flight.
    pub position: Option<GeoPoint>,
    /// Whether a scan is in progress.
    pub scanning: bool,
    /// The tile being scanned, or the last one scanned.
    pub target: Option<TileRecord>,
}

/// A visible transition of the drone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DroneEvent {
    /// The drone flew to a tile and started scanning it.
    ScanStarted(TileId),
    /// A scan completed; the tile is now revealed.
    Revealed(TileId),
    /// A scan was abandoned before it completed.
    Cancelled(TileId),
    /// The last pending tile finished its cycle; the drone is idle.
    QueueDrained,
}

/// Internal timing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Scanning { until: Instant },
    Settling { until: Instant },
}

/// FIFO reveal queue driving a single drone.
#[derive(Debug)]
pub struct Animator {
    queue: VecDeque<TileRecord>,
    phase: Phase,
    drone: DroneState,
    scan_duration: Duration,
    settle_delay: Duration,
}

impl Animator {
    /// Create an idle animator.
    pub const fn new(scan_duration: Duration, settle_delay: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            phase: Phase::Idle,
            drone: DroneState {
                position: None,
                scanning: false,
                target: None,
            },
            scan_duration,
            settle_delay,
        }
    }

    /// Append a tile to the queue. If the drone is idle the scan starts
    /// immediately; otherwise the tile waits its turn.
    pub fn enqueue(&mut self, tile: TileRecord, now: Instant) -> Vec<DroneEvent> {
        self.queue.push_back(tile);
        let mut events = Vec::new();
        if self.phase == Phase::Idle {
            self.start_next(now, &mut events);
        }
        events
    }

    /// Complete every phase that is due at `now`, in order.
    pub fn advance(&mut self, now: Instant) -> Vec<DroneEvent> {
        let mut events = Vec::new();
        loop {
            match self.phase {
                Phase::Scanning { until } if until <= now => {
                    self.drone.scanning = false;
                    if let Some(tile) = &self.drone.target {
                        events.push(DroneEvent::Revealed(tile.id.clone()));
                    }
                    self.phase = Phase::Settling {
                        until: later(until, self.settle_delay),
                    };
                }
                Phase::Settling { until } if until <= now => {
                    if self.queue.is_empty() {
                        self.phase = Phase::Idle;
                        events.push(DroneEvent::QueueDrained);
                    } else {
                        // Start from the scheduled time so a late wakeup
                        // does not stretch later cycles.
                        self.start_next(until, &mut events);
                    }
                }
                _ => break,
            }
        }
        events
    }

    /// Drop every pending tile and abandon any in-flight scan.
    ///
    /// The drone stays where it is and keeps its last target for display
    /// context.
    pub fn cancel(&mut self) -> Vec<DroneEvent> {
        let mut events = Vec::new();
        if matches!(self.phase, Phase::Scanning { .. }) {
            if let Some(tile) = &self.drone.target {
                events.push(DroneEvent::Cancelled(tile.id.clone()));
            }
        }
        self.queue.clear();
        self.drone.scanning = false;
        self.phase = Phase::Idle;
        events
    }

    /// When [`advance`](Self::advance) next has work to do.
    pub const fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Idle => None,
            Phase::Scanning { until } | Phase::Settling { until } => Some(until),
        }
    }

    /// The drone as the presentation layer should draw it.
    pub const fn drone(&self) -> &DroneState {
        &self.drone
    }

    /// Tiles waiting behind the current cycle.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether no cycle is in progress.
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    fn start_next(&mut self, at: Instant, events: &mut Vec<DroneEvent>) {
        let Some(tile) = self.queue.pop_front() else {
            self.phase = Phase::Idle;
            return;
        };
        events.push(DroneEvent::ScanStarted(tile.id.clone()));
        self.drone.position = Some(tile.center());
        self.drone.scanning = true;
        self.drone.target = Some(tile);
        self.phase = Phase::Scanning {
            until: later(at, self.scan_duration),
        };
    }
}

fn later(at: Instant, by: Duration) -> Instant {
    at.checked_add(by).unwrap_or(at)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use skyscan_types::{GeoBounds, LatLonBox, TileMetadata};

    use super::*;

    const SCAN: Duration = Duration::from_millis(2000);
    const SETTLE: Duration = Duration::from_millis(500);

    fn tile(id: &str, bbox: [f64; 4]) -> TileRecord {
        let metadata = TileMetadata {
            filename: format!("{id}.tif"),
            row: 0,
            col: 0,
            bounds: LatLonBox(bbox).normalize(),
            bbox: LatLonBox(bbox),
            width: 512,
            height: 512,
        };
        TileRecord {
            id: TileId::from(id),
            extent: metadata.extent(),
            metadata,
            tile_url: String::new(),
            info_url: String::new(),
            timestamp: 0,
        }
    }

    fn t(id: &str) -> TileRecord {
        tile(id, [0.0, 0.0, 1.0, 1.0])
    }

    fn at(base: Instant, ms: u64) -> Instant {
        later(base, Duration::from_millis(ms))
    }

    fn id(s: &str) -> TileId {
        TileId::from(s)
    }

    /// A compact trace of the visible state: `I` idle or `S(x)` scanning.
    fn trace(anim: &Animator) -> String {
        let drone = anim.drone();
        if drone.scanning {
            format!("S({})", drone.target.as_ref().unwrap().id)
        } else {
            String::from("I")
        }
    }

    #[test]
    fn fifo_cycles_never_interleave() {
        let t0 = Instant::now();
        let mut anim = Animator::new(SCAN, SETTLE);
        let mut seen = vec![trace(&anim)];

        anim.enqueue(t("A"), t0);
        anim.enqueue(t("B"), t0);
        anim.enqueue(t("C"), t0);
        seen.push(trace(&anim));

        // Step through time in small increments, recording every change.
        for ms in (0..=8000).step_by(50) {
            anim.advance(at(t0, ms));
            let now = trace(&anim);
            if seen.last() != Some(&now) {
                seen.push(now);
            }
        }

        assert_eq!(seen, ["I", "S(A)", "I", "S(B)", "I", "S(C)", "I"]);
        assert!(anim.is_idle());
        assert_eq!(anim.pending(), 0);
    }

    #[test]
    fn events_follow_the_cycle() {
        let t0 = Instant::now();
        let mut anim = Animator::new(SCAN, SETTLE);

        assert_eq!(anim.enqueue(t("A"), t0), [DroneEvent::ScanStarted(id("A"))]);
        // Enqueueing while busy never interrupts.
        assert!(anim.enqueue(t("B"), at(t0, 100)).is_empty());
        assert_eq!(anim.pending(), 1);

        assert!(anim.advance(at(t0, 1999)).is_empty());
        assert_eq!(anim.advance(at(t0, 2000)), [DroneEvent::Revealed(id("A"))]);
        assert!(anim.advance(at(t0, 2499)).is_empty());
        assert_eq!(anim.advance(at(t0, 2500)), [DroneEvent::ScanStarted(id("B"))]);
        assert_eq!(
            anim.advance(at(t0, 5000)),
            [DroneEvent::Revealed(id("B")), DroneEvent::QueueDrained]
        );
        assert_eq!(anim.next_deadline(), None);
    }

    #[test]
    fn late_wakeup_catches_up_in_order() {
        let t0 = Instant::now();
        let mut anim = Animator::new(SCAN, SETTLE);
        anim.enqueue(t("A"), t0);
        anim.enqueue(t("B"), t0);

        let events = anim.advance(at(t0, 10_000));
        assert_eq!(
            events,
            [
                DroneEvent::Revealed(id("A")),
                DroneEvent::ScanStarted(id("B")),
                DroneEvent::Revealed(id("B")),
                DroneEvent::QueueDrained,
            ]
        );
    }

    #[test]
    fn tile_enqueued_during_settle_waits_for_it() {
        let t0 = Instant::now();
        let mut anim = Animator::new(SCAN, SETTLE);
        anim.enqueue(t("A"), t0);
        anim.advance(at(t0, 2000));

        assert!(anim.enqueue(t("B"), at(t0, 2100)).is_empty());
        assert!(!anim.drone().scanning);
        assert_eq!(anim.next_deadline(), Some(at(t0, 2500)));
        assert_eq!(anim.advance(at(t0, 2500)), [DroneEvent::ScanStarted(id("B"))]);
    }

    #[test]
    fn drone_flies_to_normalized_center_and_stays() {
        let t0 = Instant::now();
        let mut anim = Animator::new(SCAN, SETTLE);
        anim.enqueue(tile("A", [32.99, 17.08, 33.10, 17.18]), t0);

        let pos = anim.drone().position.unwrap();
        assert!((pos.lon - 17.13).abs() < 1e-9);
        assert!((pos.lat - 33.045).abs() < 1e-9);

        anim.advance(at(t0, 60_000));
        assert!(anim.is_idle());
        // Position and last target are retained once idle.
        assert_eq!(anim.drone().position, Some(pos));
        assert_eq!(anim.drone().target.as_ref().unwrap().id, id("A"));
    }

    #[test]
    fn cancel_stops_scan_and_clears_queue() {
        let t0 = Instant::now();
        let mut anim = Animator::new(SCAN, SETTLE);
        anim.enqueue(t("A"), t0);
        anim.enqueue(t("B"), t0);

        assert_eq!(anim.cancel(), [DroneEvent::Cancelled(id("A"))]);
        assert!(anim.is_idle());
        assert!(!anim.drone().scanning);
        assert_eq!(anim.pending(), 0);
        assert!(anim.drone().position.is_some());
        assert!(anim.advance(at(t0, 60_000)).is_empty());

        // Cancelling while idle reports nothing.
        assert!(anim.cancel().is_empty());
    }
}
