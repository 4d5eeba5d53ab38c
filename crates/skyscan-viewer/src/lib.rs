//! SkyScan viewer.
//!
//! Connects to the tile server's realtime channel, mirrors its registry
//! locally, and paces newly arrived tiles through a one-at-a-time drone
//! reveal animation.
//!
//! # Modules
//!
//! - [`reconciler`]: local tile state (known vs. revealed) and how each
//!   server message changes it
//! - [`animation`]: FIFO reveal queue and the drone state machine
//! - [`connection`]: connect, consume, reconnect with a fixed delay
//! - [`config`]: environment-driven settings

pub mod animation;
pub mod config;
pub mod connection;
pub mod error;
pub mod reconciler;

pub use animation::{Animator, DroneEvent, DroneState};
pub use config::ViewerConfig;
pub use connection::{Viewer, ViewerUpdate};
pub use error::ViewerError;
pub use reconciler::{ConnectionStatus, Reconciler};
