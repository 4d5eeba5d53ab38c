//! Tile API server for SkyScan.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) pushing a full snapshot on connect
//!   and one `new_tile` message per registration
//! - **REST endpoints** for listing tiles, fetching one tile, health, and
//!   client configuration
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! [`TileHub`] owns the tile registry and the broadcast channel. It is
//! built once at startup and shared through [`AppState`]. The hub's
//! ingest loop is the registry's only writer; registration and broadcast
//! happen under one write lock, and session joins take the read lock
//! while subscribing, so every session sees each tile exactly once:
//! either in its snapshot or as a change event.
//!
//! [`TileHub`]: hub::TileHub
//! [`AppState`]: state::AppState

pub mod error;
pub mod handlers;
pub mod hub;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use hub::{Session, SessionEnd, TileHub};
pub use router::build_router;
pub use server::{serve, start_server, ServerConfig, ServerError};
pub use state::AppState;
