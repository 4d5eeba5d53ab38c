//! In-memory tile registry.
//!
//! The registry is append-only: tiles are immutable facts once captured,
//! so there is no update or delete. Registration is idempotent by id.
//! Records are kept in arrival order, which is filesystem-discovery order
//! and not necessarily row/column order.

use std::collections::BTreeMap;

use chrono::Utc;
use skyscan_types::{TileId, TileMetadata, TileRecord};
use tracing::debug;

/// Append-only store of registered tiles.
#[derive(Debug, Clone)]
pub struct TileRegistry {
    /// Records in arrival order.
    records: Vec<TileRecord>,
    /// Position of each id in `records`.
    index: BTreeMap<TileId, usize>,
    /// Rendering service base URL, used for tile and metadata URLs.
    render_base_url: String,
    /// Store location as seen by the rendering service.
    raster_uri_prefix: String,
}

impl TileRegistry {
    /// Create an empty registry.
    ///
    /// `render_base_url` is the rendering service address viewers use;
    /// `raster_uri_prefix` is where that service finds the artifact store.
    pub fn new(render_base_url: impl Into<String>, raster_uri_prefix: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            index: BTreeMap::new(),
            render_base_url: trim_slash(render_base_url.into()),
            raster_uri_prefix: trim_slash(raster_uri_prefix.into()),
        }
    }

    /// Register a tile, stamping it with rendering URLs and the current time.
    ///
    /// Returns `None` without touching the registry if `id` is already
    /// registered.
    pub fn register(&mut self, id: TileId, metadata: TileMetadata) -> Option<TileRecord> {
        self.register_at(id, metadata, Utc::now().timestamp_millis())
    }

    /// [`register`](Self::register) with an explicit arrival timestamp.
    pub fn register_at(
        &mut self,
        id: TileId,
        metadata: TileMetadata,
        timestamp: i64,
    ) -> Option<TileRecord> {
        if self.index.contains_key(&id) {
            debug!(tile_id = %id, "tile already registered, ignoring");
            return None;
        }

        let raster = format!("{}/{}", self.raster_uri_prefix, metadata.filename);
        let record = TileRecord {
            id: id.clone(),
            extent: metadata.extent(),
            tile_url: format!(
                "{}/cog/tiles/WebMercatorQuad/{{z}}/{{x}}/{{y}}.png?url={raster}",
                self.render_base_url
            ),
            info_url: format!("{}/cog/info?url={raster}", self.render_base_url),
            timestamp,
            metadata,
        };

        self.index.insert(id, self.records.len());
        self.records.push(record.clone());
        Some(record)
    }

    /// All registered tiles, in arrival order.
    pub fn snapshot(&self) -> Vec<TileRecord> {
        self.records.clone()
    }

    /// Look up a single tile.
    pub fn get(&self, id: &TileId) -> Option<&TileRecord> {
        self.index.get(id).and_then(|&pos| self.records.get(pos))
    }

    /// Whether `id` has been registered.
    pub fn contains(&self, id: &TileId) -> bool {
        self.index.contains_key(id)
    }

    /// Number of registered tiles.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no tile has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The rendering service base URL sent in every snapshot.
    pub fn render_base_url(&self) -> &str {
        &self.render_base_url
    }
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}
