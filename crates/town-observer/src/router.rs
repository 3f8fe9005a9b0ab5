//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin viewers.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::control;
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- `WebSocket` world updates and commands
/// - `GET /api/world` -- current world state
/// - `GET /api/agents` -- list agents
/// - `POST /api/agents` -- add an agent
/// - `GET /api/agents/{id}` -- single agent detail
/// - `POST /api/simulation/start` -- start the tick loop
/// - `POST /api/simulation/stop` -- stop the tick loop
/// - `GET /api/simulation/status` -- loop status
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_world))
        // World
        .route("/api/world", get(handlers::get_world))
        .route(
            "/api/agents",
            get(handlers::list_agents).post(handlers::create_agent),
        )
        .route("/api/agents/{id}", get(handlers::get_agent))
        // Control
        .route("/api/simulation/start", post(control::start))
        .route("/api/simulation/stop", post(control::stop))
        .route("/api/simulation/status", get(control::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
