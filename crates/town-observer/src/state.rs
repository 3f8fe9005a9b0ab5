//! Shared application state for the Observer API server.
//!
//! The observer holds no copy of the world. Every read goes through the
//! [`Simulation`] facade, which hands out deep-copied snapshots, and every
//! push comes from the simulation's broadcast channel.

use std::sync::Arc;

use tokio::sync::broadcast;
use town_core::Simulation;
use town_types::WorldState;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The simulation being observed and controlled.
    pub simulation: Arc<Simulation>,
}

impl AppState {
    /// Observe `simulation`.
    pub const fn new(simulation: Arc<Simulation>) -> Self {
        Self { simulation }
    }

    /// Subscribe to published world snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<WorldState> {
        self.simulation.subscribe()
    }
}
