//! Artifact store watcher.
//!
//! Turns raw filesystem activity in the store directory into validated
//! [`TileReady`] notifications.
//!
//! # Pipeline
//!
//! ```text
//! notify --> debouncer (quiet for 500 ms) --> counterpart quiet? --> pairing gate --> parse --> TileReady
//! ```
//!
//! - A tile is two files with a common stem: `<id>.<raster-ext>` and
//!   `<id>.json`, written in any order.
//! - A settled file is acted on only when the other half of its pair is
//!   also quiet. Otherwise it is deferred; the other half settles later
//!   and re-evaluates the pair.
//! - A sidecar is accepted only once its raster exists. If the raster is
//!   missing the event is dropped; when the raster settles later, its
//!   sidecar is evaluated again.
//! - A malformed sidecar is logged and dropped.
//! - On startup the directory is scanned once and every complete pair is
//!   emitted before live events are processed. Each tile id is emitted at
//!   most once per watcher.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use notify_debouncer_mini::{
    new_debouncer, DebounceEventResult, DebouncedEvent, DebouncedEventKind, Debouncer,
};
use skyscan_types::{TileId, TileMetadata};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WatcherConfig;
use crate::error::CoreError;

/// Extension of tile metadata sidecars.
const SIDECAR_EXTENSION: &str = "json";

/// A complete, parsed tile ready for registration.
#[derive(Debug, Clone, PartialEq)]
pub struct TileReady {
    /// The tile's id (common file stem).
    pub id: TileId,
    /// The parsed sidecar.
    pub metadata: TileMetadata,
}

/// Which half of a tile pair a path is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileRole {
    Sidecar,
    Raster,
}

/// Watches one artifact store directory.
#[derive(Debug)]
pub struct TileWatcher {
    dir: PathBuf,
    raster_extension: String,
    config: WatcherConfig,
    /// Ids already emitted, from the startup scan or live events.
    emitted: BTreeSet<TileId>,
    /// Paths the debouncer reports as still changing.
    busy: BTreeSet<PathBuf>,
}

impl TileWatcher {
    /// Create a watcher for `dir`, pairing sidecars with rasters that use
    /// `raster_extension` (without the dot).
    pub fn new(dir: impl Into<PathBuf>, raster_extension: impl Into<String>, config: WatcherConfig) -> Self {
        Self {
            dir: dir.into(),
            raster_extension: raster_extension.into(),
            config,
            emitted: BTreeSet::new(),
            busy: BTreeSet::new(),
        }
    }

    /// The directory being watched.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the store once and return every complete, valid tile.
    ///
    /// Sidecars are visited in file name order. Returned tiles are marked
    /// as emitted, so later live events for them are suppressed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StoreUnreadable`] if the directory cannot be listed.
    pub fn scan_existing(&mut self) -> Result<Vec<TileReady>, CoreError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| CoreError::StoreUnreadable {
            path: self.dir.clone(),
            source,
        })?;

        let mut sidecars: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| self.classify(path).is_some_and(|(_, role)| role == FileRole::Sidecar))
            .collect();
        sidecars.sort();

        let mut ready = Vec::new();
        for path in sidecars {
            if let Some(tile) = self.accept(&path) {
                ready.push(tile);
            }
        }
        info!(dir = %self.dir.display(), tiles = ready.len(), "startup scan complete");
        Ok(ready)
    }

    /// Evaluate a settled path against the pairing gate.
    ///
    /// Accepts either half of a pair. Returns `Ok(None)` for files that
    /// are not tile artifacts and for incomplete pairs.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SidecarIo`] or [`CoreError::MalformedSidecar`]
    /// when a paired sidecar cannot be used.
    pub fn evaluate(&self, path: &Path) -> Result<Option<TileReady>, CoreError> {
        let Some((id, _)) = self.classify(path) else {
            return Ok(None);
        };

        let sidecar = path.with_extension(SIDECAR_EXTENSION);
        let raster = path.with_extension(&self.raster_extension);
        if !raster.is_file() {
            debug!(tile_id = %id, "raster not present yet, dropping event");
            return Ok(None);
        }
        if !sidecar.is_file() {
            debug!(tile_id = %id, "sidecar not present yet, dropping event");
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&sidecar).map_err(|source| CoreError::SidecarIo {
            path: sidecar.clone(),
            source,
        })?;
        let metadata = TileMetadata::from_json(&contents)
            .map_err(|source| CoreError::MalformedSidecar { path: sidecar, source })?;

        Ok(Some(TileReady { id, metadata }))
    }

    /// Attach to the filesystem, run the startup scan, and spawn the live
    /// loop. Tiles are delivered on `tx`, startup tiles first.
    ///
    /// The filesystem watch is attached before the scan so that nothing
    /// written during the scan is missed. The task ends when `tx` closes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Watch`] if the directory cannot be watched, or
    /// [`CoreError::StoreUnreadable`] if the startup scan fails.
    pub fn spawn(mut self, tx: mpsc::Sender<TileReady>) -> Result<JoinHandle<()>, CoreError> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<Vec<DebouncedEvent>>();

        let mut debouncer = new_debouncer(
            self.config.quiescence(),
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    let _ = raw_tx.send(events);
                }
                Err(e) => warn!(error = ?e, "filesystem watch error"),
            },
        )?;
        debouncer
            .watcher()
            .watch(&self.dir, RecursiveMode::NonRecursive)?;
        info!(
            dir = %self.dir.display(),
            quiescence_ms = self.config.quiescence_ms,
            "watching artifact store"
        );

        let initial = self.scan_existing()?;

        Ok(tokio::spawn(async move {
            for tile in initial {
                if tx.send(tile).await.is_err() {
                    return;
                }
            }
            self.run(debouncer, raw_rx, tx).await;
        }))
    }

    async fn run(
        mut self,
        _debouncer: Debouncer<RecommendedWatcher>,
        mut raw_rx: mpsc::UnboundedReceiver<Vec<DebouncedEvent>>,
        tx: mpsc::Sender<TileReady>,
    ) {
        while let Some(events) = raw_rx.recv().await {
            for tile in self.settle(events) {
                if tx.send(tile).await.is_err() {
                    info!("tile consumer closed, watcher stopping");
                    return;
                }
            }
        }
        debug!("filesystem event stream closed");
    }

    /// Apply one debounced batch and return the tiles it completes.
    ///
    /// Continuous events mark a path busy. Settled events clear it and
    /// are evaluated, unless the other half of the pair is still changing.
    fn settle(&mut self, events: Vec<DebouncedEvent>) -> Vec<TileReady> {
        let mut settled = BTreeSet::new();
        for event in events {
            if self.classify(&event.path).is_none() {
                continue;
            }
            if matches!(event.kind, DebouncedEventKind::AnyContinuous) {
                self.busy.insert(event.path);
            } else {
                self.busy.remove(&event.path);
                settled.insert(event.path);
            }
        }

        let mut ready = Vec::new();
        for path in &settled {
            if let Some(other) = self.counterpart(path) {
                if !settled.contains(&other) && !self.is_quiet(&other) {
                    debug!(path = %path.display(), "other half still being written, deferring");
                    continue;
                }
            }
            if let Some(tile) = self.accept(path) {
                ready.push(tile);
            }
        }
        ready
    }

    /// Whether `path` has seen no writes for a full quiescence window.
    /// A missing file counts as quiet; the pairing gate handles it.
    fn is_quiet(&self, path: &Path) -> bool {
        if self.busy.contains(path) {
            return false;
        }
        let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
            return true;
        };
        !matches!(modified.elapsed(), Ok(age) if age < self.config.quiescence())
    }

    /// The other half of `path`'s pair.
    fn counterpart(&self, path: &Path) -> Option<PathBuf> {
        let (_, role) = self.classify(path)?;
        Some(match role {
            FileRole::Sidecar => path.with_extension(&self.raster_extension),
            FileRole::Raster => path.with_extension(SIDECAR_EXTENSION),
        })
    }

    /// Evaluate `path`, suppress already-emitted ids, and log drops.
    fn accept(&mut self, path: &Path) -> Option<TileReady> {
        let (id, _) = self.classify(path)?;
        if self.emitted.contains(&id) {
            debug!(tile_id = %id, "tile already emitted, suppressing event");
            return None;
        }

        match self.evaluate(path) {
            Ok(Some(tile)) => {
                debug!(tile_id = %tile.id, row = tile.metadata.row, col = tile.metadata.col, "tile ready");
                self.emitted.insert(tile.id.clone());
                Some(tile)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "dropping tile event");
                None
            }
        }
    }

    /// Identify a path as a sidecar or raster and extract its tile id.
    fn classify(&self, path: &Path) -> Option<(TileId, FileRole)> {
        let ext = path.extension()?.to_str()?;
        // Exact match: pairing rebuilds paths from these same extensions.
        let role = if ext == SIDECAR_EXTENSION {
            FileRole::Sidecar
        } else if ext == self.raster_extension {
            FileRole::Raster
        } else {
            return None;
        };
        let stem = path.file_stem()?.to_str()?;
        if stem.is_empty() || stem.starts_with('.') {
            return None;
        }
        Some((TileId::from(stem), role))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn watcher(dir: &Path) -> TileWatcher {
        TileWatcher::new(dir, "tif", WatcherConfig::default())
    }

    #[test]
    fn classify_roles() {
        let w = watcher(Path::new("/store"));
        assert_eq!(
            w.classify(Path::new("/store/tile_0_1.json")),
            Some((TileId::from("tile_0_1"), FileRole::Sidecar))
        );
        assert_eq!(
            w.classify(Path::new("/store/tile_0_1.tif")),
            Some((TileId::from("tile_0_1"), FileRole::Raster))
        );
        assert_eq!(w.classify(Path::new("/store/tile_0_1.TIF")), None);
        assert_eq!(w.classify(Path::new("/store/tile_0_1.JSON")), None);
        assert_eq!(w.classify(Path::new("/store/tile_0_1.png")), None);
        assert_eq!(w.classify(Path::new("/store/README")), None);
        assert_eq!(w.classify(Path::new("/store/.json")), None);
    }

    #[test]
    fn counterpart_swaps_extension() {
        let w = watcher(Path::new("/store"));
        assert_eq!(
            w.counterpart(Path::new("/store/tile_0_1.json")),
            Some(PathBuf::from("/store/tile_0_1.tif"))
        );
        assert_eq!(
            w.counterpart(Path::new("/store/tile_0_1.tif")),
            Some(PathBuf::from("/store/tile_0_1.json"))
        );
        assert_eq!(w.counterpart(Path::new("/store/notes.txt")), None);
    }

    #[test]
    fn settle_defers_while_other_half_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("tile_0_0.json");
        let raster = dir.path().join("tile_0_0.tif");
        std::fs::write(&raster, b"partial").unwrap();
        std::fs::write(
            &json,
            r#"{"filename":"tile_0_0.tif","row":0,"col":0,
                "bounds":{"min_lon":0.0,"min_lat":0.0,"max_lon":1.0,"max_lat":1.0},
                "bbox":[0.0,0.0,1.0,1.0],"width":1,"height":1}"#,
        )
        .unwrap();
        let mut w = TileWatcher::new(
            dir.path(),
            "tif",
            WatcherConfig {
                quiescence_ms: 0,
                ready_capacity: 1,
            },
        );

        let event = |path: &Path, kind| DebouncedEvent {
            path: path.to_path_buf(),
            kind,
        };
        assert!(w.settle(vec![event(&raster, DebouncedEventKind::AnyContinuous)]).is_empty());
        assert!(w.settle(vec![event(&json, DebouncedEventKind::Any)]).is_empty());

        let ready = w.settle(vec![event(&raster, DebouncedEventKind::Any)]);
        assert_eq!(ready.len(), 1);
        assert!(w.busy.is_empty());
    }
}
