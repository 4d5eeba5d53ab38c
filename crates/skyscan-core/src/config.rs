//! Configuration loading and typed config structures for the SkyScan server.
//!
//! The configuration lives in an optional `skyscan-config.yaml`. Every
//! field has a default, so an empty or missing file yields a working
//! development setup that watches `./tiles` and serves on port 8080.
//!
//! Environment variables override the file for the values that usually
//! differ per deployment:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `TILE_DIR` | `store.dir` |
//! | `TILE_RENDER_URL` | `render.base_url` |
//! | `SKYSCAN_PORT` | `http.port` |
//! | `PUBLIC_WS_URL` | `http.public_ws_url` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override held an unusable value.
    #[error("invalid {var}: {message}")]
    InvalidEnv {
        /// The offending variable name.
        var: &'static str,
        /// Why the value was rejected.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SkyscanConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Artifact store location and file naming.
    #[serde(default)]
    pub store: StoreConfig,

    /// Watcher debounce timing.
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Raster-rendering collaborator.
    #[serde(default)]
    pub render: RenderConfig,

    /// Realtime fan-out settings.
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

impl SkyscanConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if it is not valid YAML, or
    /// [`ConfigError::InvalidEnv`] if an override cannot be parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    /// Environment overrides apply either way.
    ///
    /// # Errors
    ///
    /// Same as [`from_file`](Self::from_file) when `path` exists; otherwise
    /// only [`ConfigError::InvalidEnv`].
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string, without environment overrides.
    ///
    /// An empty document is accepted and yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the document does not match the schema.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if an override cannot be parsed.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] if an override cannot be parsed.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("TILE_DIR") {
            self.store.dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("TILE_RENDER_URL") {
            self.render.base_url = val;
        }
        if let Some(val) = lookup("SKYSCAN_PORT") {
            self.http.port = val.parse().map_err(|e| ConfigError::InvalidEnv {
                var: "SKYSCAN_PORT",
                message: format!("{e}"),
            })?;
        }
        if let Some(val) = lookup("PUBLIC_WS_URL") {
            self.http.public_ws_url = Some(val);
        }
        Ok(())
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Realtime channel address advertised by `/api/config`. When unset it
    /// is derived from the request's `Host` header.
    #[serde(default)]
    pub public_ws_url: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_ws_url: None,
        }
    }
}

/// Artifact store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Directory the producer writes tiles into.
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,

    /// Raster file extension, without the dot.
    #[serde(default = "default_raster_extension")]
    pub raster_extension: String,

    /// Location of the store as seen by the rendering service (for example
    /// `file:///data`). Raster references are `{prefix}/{filename}`.
    #[serde(default = "default_raster_uri_prefix")]
    pub raster_uri_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: default_store_dir(),
            raster_extension: default_raster_extension(),
            raster_uri_prefix: default_raster_uri_prefix(),
        }
    }
}

/// Debounce timing for the artifact store watcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatcherConfig {
    /// A file must see no writes for this long before it is read.
    #[serde(default = "default_quiescence_ms")]
    pub quiescence_ms: u64,

    /// Capacity of the channel from the watcher to the event loop.
    #[serde(default = "default_ready_capacity")]
    pub ready_capacity: usize,
}

impl WatcherConfig {
    /// The quiescence window as a [`Duration`].
    pub const fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quiescence_ms: default_quiescence_ms(),
            ready_capacity: default_ready_capacity(),
        }
    }
}

/// Raster-rendering service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RenderConfig {
    /// Base URL viewers use to reach the rendering service.
    #[serde(default = "default_render_base_url")]
    pub base_url: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            base_url: default_render_base_url(),
        }
    }
}

/// Realtime fan-out configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    /// Per-session buffer of undelivered change events. A session that
    /// falls further behind than this is disconnected and must resync.
    #[serde(default = "default_broadcast_capacity")]
    pub capacity: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            capacity: default_broadcast_capacity(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_port() -> u16 {
    8080
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("tiles")
}

fn default_raster_extension() -> String {
    "tif".to_owned()
}

fn default_raster_uri_prefix() -> String {
    "file:///data".to_owned()
}

const fn default_quiescence_ms() -> u64 {
    500
}

const fn default_ready_capacity() -> usize {
    1024
}

fn default_render_base_url() -> String {
    "http://localhost:8000".to_owned()
}

const fn default_broadcast_capacity() -> usize {
    256
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SkyscanConfig::default();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.store.raster_extension, "tif");
        assert_eq!(config.watcher.quiescence(), Duration::from_millis(500));
        assert_eq!(config.broadcast.capacity, 256);
        assert!(config.http.public_ws_url.is_none());
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        assert_eq!(SkyscanConfig::parse("").unwrap(), SkyscanConfig::default());
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
store:
  dir: /srv/tiles
  raster_extension: tiff
render:
  base_url: http://titiler:8000
watcher:
  quiescence_ms: 250
";
        let config = SkyscanConfig::parse(yaml).unwrap();
        assert_eq!(config.store.dir, PathBuf::from("/srv/tiles"));
        assert_eq!(config.store.raster_extension, "tiff");
        assert_eq!(config.render.base_url, "http://titiler:8000");
        assert_eq!(config.watcher.quiescence_ms, 250);
        // Untouched fields keep their defaults.
        assert_eq!(config.watcher.ready_capacity, 1024);
        assert_eq!(config.http.port, 8080);
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let result = SkyscanConfig::parse("http: [not, a, map");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: BTreeMap<&str, &str> = [
            ("TILE_DIR", "/data"),
            ("TILE_RENDER_URL", "http://render:9000"),
            ("SKYSCAN_PORT", "9090"),
            ("PUBLIC_WS_URL", "wss://maps.example/ws"),
        ]
        .into_iter()
        .collect();

        let mut config = SkyscanConfig::default();
        config
            .apply_overrides_from(|k| vars.get(k).map(|v| (*v).to_owned()))
            .unwrap();

        assert_eq!(config.store.dir, PathBuf::from("/data"));
        assert_eq!(config.render.base_url, "http://render:9000");
        assert_eq!(config.http.port, 9090);
        assert_eq!(config.http.public_ws_url.as_deref(), Some("wss://maps.example/ws"));
    }

    #[test]
    fn bad_port_override_is_an_error() {
        let mut config = SkyscanConfig::default();
        let result = config.apply_overrides_from(|k| {
            (k == "SKYSCAN_PORT").then(|| "not-a-port".to_owned())
        });
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnv { var: "SKYSCAN_PORT", .. })
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SkyscanConfig::load_or_default(&dir.path().join("absent.yaml"));
        assert!(config.is_ok());
    }
}
