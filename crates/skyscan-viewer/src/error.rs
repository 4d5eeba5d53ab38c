//! Error types for the viewer.
//!
//! Connectivity problems are not errors here: the connection loop retries
//! them forever. What remains is configuration that cannot be used.

/// Errors that stop the viewer from starting.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
}
