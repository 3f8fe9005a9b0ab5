//! Observer API server for the town simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) pushing every published world
//!   snapshot and accepting start, stop, query and add-agent commands
//! - **REST endpoints** for the world state and agents
//! - **Control endpoints** for starting and stopping the tick loop
//! - **Minimal HTML page** (`GET /`) with the current tick and links
//!
//! # Architecture
//!
//! The observer owns no world state. It calls the
//! [`Simulation`](town_core::Simulation) facade for reads and commands,
//! and relays the facade's broadcast channel to socket clients with
//! automatic lag handling.

pub mod control;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{ObserverHandle, StartupError, spawn_observer};
pub use state::AppState;
pub use ws::{ClientCommand, ServerEvent};
