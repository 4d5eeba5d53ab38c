//! Messages pushed from the broadcast hub to viewers.
//!
//! The realtime channel carries exactly two kinds of message, encoded as
//! JSON text frames with a `type` discriminator:
//!
//! | `type` | Sent | Payload |
//! |--------|------|---------|
//! | `initial` | once, first, per session | every registered tile + rendering base URL |
//! | `new_tile` | once per registration | the newly registered tile |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::tile::TileRecord;

/// A server-to-viewer message on the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// Full registry snapshot, sent once when a session opens.
    Initial {
        /// Every registered tile, in arrival order.
        tiles: Vec<TileRecord>,
        /// Base URL of the raster-rendering service.
        #[serde(rename = "tileRenderBaseUrl")]
        tile_render_base_url: String,
    },
    /// A single newly registered tile.
    NewTile {
        /// The new record.
        tile: TileRecord,
    },
}

impl ServerMessage {
    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error only if serialization fails, which does not happen
    /// for well-formed records.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not a known message.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn initial_uses_wire_field_names() {
        let msg = ServerMessage::Initial {
            tiles: Vec::new(),
            tile_render_base_url: String::from("http://localhost:8000"),
        };
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "initial");
        assert_eq!(json["tileRenderBaseUrl"], "http://localhost:8000");
        assert!(json["tiles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn decodes_new_tile_frame() {
        let text = r#"{
            "type": "new_tile",
            "tile": {
                "id": "tile_2_3",
                "filename": "tile_2_3.tif",
                "row": 2,
                "col": 3,
                "bounds": {"min_lon": 1.0, "min_lat": 2.0, "max_lon": 3.0, "max_lat": 4.0},
                "bbox": [2.0, 1.0, 4.0, 3.0],
                "width": 256,
                "height": 256,
                "extent": {"min_lon": 1.0, "min_lat": 2.0, "max_lon": 3.0, "max_lat": 4.0},
                "tile_url": "u",
                "info_url": "i",
                "timestamp": 5
            }
        }"#;
        let msg = ServerMessage::from_json(text).unwrap();
        assert!(matches!(
            &msg,
            ServerMessage::NewTile { tile }
                if tile.id.as_str() == "tile_2_3" && (tile.metadata.row, tile.metadata.col) == (2, 3)
        ));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(ServerMessage::from_json(r#"{"type": "bogus"}"#).is_err());
    }
}
