//! Geographic extents and the axis-order boundary.
//!
//! Tile sidecars carry a `bbox` array in **lat, lon, lat, lon** order,
//! which is not the conventional lon/lat order used everywhere else.
//! [`LatLonBox::normalize`] is the only place that reads that array; every
//! consumer works with the normalized [`GeoBounds`] stored on the tile
//! record at ingestion.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

/// Rectangular extent in conventional lon/lat terms.
///
/// Also the shape of the sidecar's `bounds` object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoBounds {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl GeoBounds {
    /// Midpoint of the extent.
    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lon: f64::midpoint(self.min_lon, self.max_lon),
            lat: f64::midpoint(self.min_lat, self.max_lat),
        }
    }
}

/// The raw sidecar `bbox` array, ordered `[lat, lon, lat, lon]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(transparent)]
pub struct LatLonBox(pub [f64; 4]);

impl LatLonBox {
    /// Convert the lat/lon/lat/lon array into lon/lat bounds.
    ///
    /// Elements 0 and 2 are latitudes, elements 1 and 3 are longitudes.
    /// The two corners may come in either order; min and max are taken
    /// per axis, so the result is always a well-formed extent.
    pub fn normalize(&self) -> GeoBounds {
        let [lat_a, lon_a, lat_b, lon_b] = self.0;
        GeoBounds {
            min_lon: lon_a.min(lon_b),
            min_lat: lat_a.min(lat_b),
            max_lon: lon_a.max(lon_b),
            max_lat: lat_a.max(lat_b),
        }
    }
}
