//! Error types for the server-side core.
//!
//! Most failures in the watcher pipeline are not errors at all from the
//! caller's point of view: a missing raster or a half-written sidecar is
//! simply dropped and retried by the next filesystem event. [`CoreError`]
//! covers what remains: setting up the watch, and the reasons a sidecar
//! was rejected (logged, never propagated past the watcher loop).

use std::path::PathBuf;

/// Errors raised by the registry and watcher.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The artifact store directory could not be read.
    #[error("failed to read artifact store {path}: {source}")]
    StoreUnreadable {
        /// The directory that was scanned.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The platform filesystem watcher could not be created or attached.
    #[error("filesystem watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// A sidecar could not be read from disk.
    #[error("failed to read sidecar {path}: {source}")]
    SidecarIo {
        /// The sidecar path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A sidecar was read but is not a valid tile metadata document.
    #[error("malformed sidecar {path}: {source}")]
    MalformedSidecar {
        /// The sidecar path.
        path: PathBuf,
        /// The JSON parse error.
        source: serde_json::Error,
    },
}
