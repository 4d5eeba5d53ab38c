//! Sidecar metadata and registered tile records.
//!
//! A producer writes two files per tile into the artifact store: the raster
//! and a JSON sidecar described by [`TileMetadata`]. Once the watcher has
//! paired and parsed them, the registry wraps the metadata into an
//! immutable [`TileRecord`] with rendering URLs and an arrival timestamp.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::{GeoBounds, GeoPoint, LatLonBox};
use crate::ids::TileId;

/// Parsed content of a tile's JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TileMetadata {
    /// Raster file name, relative to the artifact store.
    pub filename: String,
    /// Grid row.
    pub row: u32,
    /// Grid column.
    pub col: u32,
    /// Producer-reported bounds in lon/lat terms.
    pub bounds: GeoBounds,
    /// Bounding box in the producer's lat/lon/lat/lon order.
    pub bbox: LatLonBox,
    /// Raster width in pixels.
    pub width: u32,
    /// Raster height in pixels.
    pub height: u32,
}

impl TileMetadata {
    /// Parse a sidecar document.
    ///
    /// # Errors
    ///
    /// Returns an error if `contents` is not a complete sidecar record.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// The tile's extent with the `bbox` axis order normalized.
    pub fn extent(&self) -> GeoBounds {
        self.bbox.normalize()
    }
}

/// A registered tile, as stored in the registry and sent over the wire.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TileRecord {
    /// Registry key.
    pub id: TileId,
    /// The sidecar fields, flattened into the record.
    #[serde(flatten)]
    pub metadata: TileMetadata,
    /// Normalized lon/lat extent derived from `bbox` on ingestion.
    pub extent: GeoBounds,
    /// Raster tile URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub tile_url: String,
    /// URL of the rendering service's metadata document for this raster.
    pub info_url: String,
    /// Arrival time, milliseconds since the Unix epoch.
    #[ts(type = "number")]
    pub timestamp: i64,
}

impl TileRecord {
    /// Where the drone flies to when revealing this tile.
    pub fn center(&self) -> GeoPoint {
        self.extent.center()
    }
}
