//! Control REST API handlers for starting and stopping the tick loop.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/simulation/start` | Start the tick loop |
//! | `POST` | `/api/simulation/stop` | Stop the tick loop |
//! | `GET` | `/api/simulation/status` | Current loop status |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use town_core::{StartOutcome, StopOutcome};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Generic control response.
#[derive(Debug, serde::Serialize)]
struct ControlResponse {
    /// Whether the request was honoured.
    ok: bool,
    /// What happened, or the state it found.
    outcome: &'static str,
    /// Human-readable message.
    message: String,
}

/// Current loop status.
#[derive(Debug, serde::Serialize)]
struct StatusResponse {
    running: bool,
    tick: u64,
    agents: usize,
    model: String,
}

/// Human-readable message for a start request.
pub(crate) const fn start_message(outcome: StartOutcome) -> &'static str {
    match outcome {
        StartOutcome::Started => "Simulation started",
        StartOutcome::AlreadyRunning => "Simulation already running",
    }
}

/// Human-readable message for a stop request.
pub(crate) const fn stop_message(outcome: StopOutcome) -> &'static str {
    match outcome {
        StopOutcome::Stopped => "Simulation stopped",
        StopOutcome::NotRunning => "Simulation was not running",
    }
}

// ---------------------------------------------------------------------------
// POST /api/simulation/start
// ---------------------------------------------------------------------------

/// Start the tick loop.
///
/// Asking twice is not an error; the second call reports that the loop is
/// already running. Fails with `503` if the language model is not
/// configured.
pub async fn start(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let outcome = state.simulation.start().await?;
    Ok(Json(ControlResponse {
        ok: true,
        outcome: match outcome {
            StartOutcome::Started => "started",
            StartOutcome::AlreadyRunning => "already_running",
        },
        message: start_message(outcome).to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/simulation/stop
// ---------------------------------------------------------------------------

/// Stop the tick loop, abandoning any tick in flight.
pub async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let outcome = state.simulation.stop().await;
    Json(ControlResponse {
        ok: true,
        outcome: match outcome {
            StopOutcome::Stopped => "stopped",
            StopOutcome::NotRunning => "not_running",
        },
        message: stop_message(outcome).to_owned(),
    })
}

// ---------------------------------------------------------------------------
// GET /api/simulation/status
// ---------------------------------------------------------------------------

/// Return whether the loop runs, the tick count, and the population.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let world = state.simulation.snapshot().await;
    Json(StatusResponse {
        running: world.running,
        tick: world.tick,
        agents: world.agents.len(),
        model: state.simulation.model_name().to_owned(),
    })
}
