//! Shared type definitions for SkyScan.
//!
//! This crate is the single source of truth for the tile records that flow
//! from the artifact store watcher, through the broadcast hub, to every
//! connected viewer. Wire types derive `ts-rs` so the external map widget
//! consumes exactly the shapes the server emits.
//!
//! # Modules
//!
//! - [`ids`] -- Tile and session identifiers
//! - [`geo`] -- Bounding boxes, axis-order normalization, center points
//! - [`tile`] -- Sidecar metadata and registered tile records
//! - [`messages`] -- The realtime channel's closed message enum

pub mod geo;
pub mod ids;
pub mod messages;
pub mod tile;

// Re-export all public types at crate root for convenience.
pub use geo::{GeoBounds, GeoPoint, LatLonBox};
pub use ids::{SessionId, TileId};
pub use messages::ServerMessage;
pub use tile::{TileMetadata, TileRecord};
