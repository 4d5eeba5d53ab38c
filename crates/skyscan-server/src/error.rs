//! Error types for the server binary.
//!
//! [`ServerAppError`] is the top-level error type that wraps every
//! failure that can stop the server during startup or while serving.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum ServerAppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: skyscan_core::ConfigError,
    },

    /// The artifact store could not be scanned or watched.
    #[error("watcher error: {source}")]
    Watcher {
        /// The underlying watcher error.
        #[from]
        source: skyscan_core::CoreError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Http {
        /// The underlying server error.
        #[from]
        source: skyscan_observer::ServerError,
    },
}
