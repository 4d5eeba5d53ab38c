//! Server-side core of SkyScan: configuration, the tile registry, and the
//! artifact store watcher.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`error`] -- Error types for watcher setup and sidecar evaluation
//! - [`registry`] -- In-memory, append-only tile registry
//! - [`watcher`] -- Startup scan, debounced live watching, and the pairing gate
//!
//! The watcher never touches the registry directly. It emits
//! [`watcher::TileReady`] values on a channel; the server's event loop is
//! the registry's only writer.

pub mod config;
pub mod error;
pub mod registry;
pub mod watcher;

pub use config::{ConfigError, SkyscanConfig};
pub use error::CoreError;
pub use registry::TileRegistry;
pub use watcher::{TileReady, TileWatcher};
