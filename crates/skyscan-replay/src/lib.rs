//! Tile replay producer.
//!
//! Simulates a live drone capture by copying a directory of pre-rendered
//! tiles into the artifact store one tile at a time, in `(row, col)`
//! order, pausing between tiles. Each raster is copied before its sidecar
//! so the watcher's pairing gate sees the sidecar last, the same order a
//! real producer writes them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use skyscan_types::TileMetadata;
use tracing::{info, warn};

/// Errors that abort a replay.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The source directory could not be listed.
    #[error("cannot list {path}: {source}")]
    ListSource {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The destination directory could not be created.
    #[error("cannot create {path}: {source}")]
    CreateDest {
        /// Directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A file could not be copied.
    #[error("cannot copy {from} to {to}: {source}")]
    Copy {
        /// Source file.
        from: PathBuf,
        /// Destination file.
        to: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// One tile found in the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTile {
    /// Grid row.
    pub row: u32,
    /// Grid column.
    pub col: u32,
    /// Raster file name, e.g. `tile_0_3.tif`.
    pub raster: String,
}

impl SourceTile {
    /// Sidecar file name, e.g. `tile_0_3.json`.
    pub fn sidecar(&self) -> String {
        format!("tile_{}_{}.json", self.row, self.col)
    }
}

/// Parse `tile_<row>_<col>.<extension>` into `(row, col)`.
pub fn parse_tile_name(name: &str, extension: &str) -> Option<(u32, u32)> {
    let stem = name
        .strip_prefix("tile_")?
        .strip_suffix(extension)?
        .strip_suffix('.')?;
    let (row, col) = stem.split_once('_')?;
    Some((parse_index(row)?, parse_index(col)?))
}

fn parse_index(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// List the rasters in `source`, sorted by `(row, col)`.
///
/// # Errors
///
/// Returns [`ReplayError::ListSource`] if the directory cannot be read.
pub fn discover(source: &Path, extension: &str) -> Result<Vec<SourceTile>, ReplayError> {
    let list_err = |e| ReplayError::ListSource {
        path: source.to_path_buf(),
        source: e,
    };
    let mut tiles = Vec::new();
    for entry in std::fs::read_dir(source).map_err(list_err)? {
        let name = entry.map_err(list_err)?.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some((row, col)) = parse_tile_name(name, extension) {
            tiles.push(SourceTile {
                row,
                col,
                raster: name.to_owned(),
            });
        }
    }
    tiles.sort_by_key(|t| (t.row, t.col));
    Ok(tiles)
}

/// Copy one tile into `dest`: raster first, then the sidecar if present.
///
/// Returns the sidecar's parsed metadata when it exists and parses.
///
/// # Errors
///
/// Returns [`ReplayError::Copy`] if either file fails to copy.
pub fn copy_tile(
    tile: &SourceTile,
    source: &Path,
    dest: &Path,
) -> Result<Option<TileMetadata>, ReplayError> {
    copy_file(&source.join(&tile.raster), &dest.join(&tile.raster))?;

    let sidecar = source.join(tile.sidecar());
    if !sidecar.is_file() {
        return Ok(None);
    }
    copy_file(&sidecar, &dest.join(tile.sidecar()))?;

    let parsed = std::fs::read_to_string(&sidecar)
        .map_err(|e| e.to_string())
        .and_then(|contents| TileMetadata::from_json(&contents).map_err(|e| e.to_string()));
    match parsed {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) => {
            warn!(sidecar = %sidecar.display(), error = %e, "sidecar copied but not readable");
            Ok(None)
        }
    }
}

fn copy_file(from: &Path, to: &Path) -> Result<(), ReplayError> {
    std::fs::copy(from, to).map_err(|e| ReplayError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Copy every tile from `source` to `dest`, calling `pause(delay)` between
/// tiles (not after the last). Returns the number of tiles copied.
///
/// # Errors
///
/// Stops at the first listing, directory-creation, or copy failure.
pub fn replay<P>(
    source: &Path,
    dest: &Path,
    extension: &str,
    delay: Duration,
    mut pause: P,
) -> Result<usize, ReplayError>
where
    P: FnMut(Duration),
{
    std::fs::create_dir_all(dest).map_err(|e| ReplayError::CreateDest {
        path: dest.to_path_buf(),
        source: e,
    })?;

    let tiles = discover(source, extension)?;
    let total = tiles.len();
    info!(
        source = %source.display(),
        dest = %dest.display(),
        total,
        "replay starting"
    );

    for (index, tile) in tiles.iter().enumerate() {
        let position = index.saturating_add(1);
        match copy_tile(tile, source, dest)? {
            Some(metadata) => {
                let b = metadata.bounds;
                info!(
                    position,
                    total,
                    file = tile.raster,
                    min_lon = b.min_lon,
                    min_lat = b.min_lat,
                    max_lon = b.max_lon,
                    max_lat = b.max_lat,
                    "tile copied"
                );
            }
            None => info!(position, total, file = tile.raster, "tile copied (no metadata)"),
        }
        if position < total {
            pause(delay);
        }
    }

    info!(total, "replay finished");
    Ok(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SIDECAR: &str = r#"{
        "filename": "tile_0_0.tif", "row": 0, "col": 0,
        "bounds": {"min_lon": 17.08, "min_lat": 32.99, "max_lon": 17.18, "max_lat": 33.10},
        "bbox": [32.99, 17.08, 33.10, 17.18],
        "width": 512, "height": 512
    }"#;

    fn touch(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn parses_tile_names() {
        assert_eq!(parse_tile_name("tile_0_0.tif", "tif"), Some((0, 0)));
        assert_eq!(parse_tile_name("tile_12_3.tif", "tif"), Some((12, 3)));
        assert_eq!(parse_tile_name("tile_1_2.png", "png"), Some((1, 2)));
        assert_eq!(parse_tile_name("tile_1_2.json", "tif"), None);
        assert_eq!(parse_tile_name("tile_1_2.tiff", "tif"), None);
        assert_eq!(parse_tile_name("tile_1.tif", "tif"), None);
        assert_eq!(parse_tile_name("tile_+1_2.tif", "tif"), None);
        assert_eq!(parse_tile_name("tile__2.tif", "tif"), None);
        assert_eq!(parse_tile_name("mosaic_1_2.tif", "tif"), None);
    }

    #[test]
    fn discovers_in_row_then_column_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["tile_1_0.tif", "tile_0_10.tif", "tile_0_2.tif", "notes.txt", "tile_0_2.json"] {
            touch(dir.path(), name, "");
        }

        let names: Vec<String> = discover(dir.path(), "tif")
            .unwrap()
            .into_iter()
            .map(|t| t.raster)
            .collect();
        assert_eq!(names, ["tile_0_2.tif", "tile_0_10.tif", "tile_1_0.tif"]);
    }

    #[test]
    fn copies_every_tile_and_pauses_between() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let dest = dst.path().join("store");
        touch(src.path(), "tile_0_0.tif", "raster");
        touch(src.path(), "tile_0_0.json", SIDECAR);
        touch(src.path(), "tile_0_1.tif", "raster");
        touch(src.path(), "tile_1_0.tif", "raster");

        let mut pauses = Vec::new();
        let copied = replay(
            src.path(),
            &dest,
            "tif",
            Duration::from_millis(1500),
            |d| pauses.push(d),
        )
        .unwrap();

        assert_eq!(copied, 3);
        assert_eq!(pauses, [Duration::from_millis(1500); 2]);
        for name in ["tile_0_0.tif", "tile_0_0.json", "tile_0_1.tif", "tile_1_0.tif"] {
            assert!(dest.join(name).is_file(), "{name} missing");
        }
        assert!(!dest.join("tile_0_1.json").exists());
    }

    #[test]
    fn copy_tile_reports_sidecar_bounds() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        touch(src.path(), "tile_0_0.tif", "raster");
        touch(src.path(), "tile_0_0.json", SIDECAR);
        let tile = SourceTile {
            row: 0,
            col: 0,
            raster: String::from("tile_0_0.tif"),
        };

        let metadata = copy_tile(&tile, src.path(), dst.path()).unwrap().unwrap();
        assert!((metadata.bounds.min_lon - 17.08).abs() < 1e-9);
        assert_eq!(
            std::fs::read_to_string(dst.path().join("tile_0_0.json")).unwrap(),
            SIDECAR
        );
    }

    #[test]
    fn missing_source_is_an_error() {
        let dst = tempfile::tempdir().unwrap();
        let err = replay(
            Path::new("/nonexistent/skyscan-replay"),
            dst.path(),
            "tif",
            Duration::ZERO,
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, ReplayError::ListSource { .. }));
    }
}
