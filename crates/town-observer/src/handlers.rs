//! REST API endpoint handlers for the Observer server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/world` | Current world state |
//! | `GET` | `/api/agents` | List agent summaries |
//! | `POST` | `/api/agents` | Add an agent |
//! | `GET` | `/api/agents/{id}` | Single agent detail |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use town_core::NewAgent;
use town_types::AgentId;
use tracing::info;
use uuid::Uuid;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Name used when a new agent has none.
pub const DEFAULT_AGENT_NAME: &str = "Anonymous";

/// Personality used when a new agent has none.
pub const DEFAULT_PERSONALITY: &str = "neutral";

/// Request body for `POST /api/agents` and the `add_agent` socket command.
#[derive(Debug, Default, serde::Deserialize)]
pub struct CreateAgentRequest {
    /// Display name (default `Anonymous`).
    pub name: Option<String>,
    /// Personality description (default `neutral`).
    pub personality: Option<String>,
    /// Declared goals.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Building id to spawn in.
    pub home: Option<String>,
}

impl CreateAgentRequest {
    /// Fill in defaults.
    pub fn into_new_agent(self) -> NewAgent {
        NewAgent {
            name: self.name.unwrap_or_else(|| DEFAULT_AGENT_NAME.to_owned()),
            personality: self
                .personality
                .unwrap_or_else(|| DEFAULT_PERSONALITY.to_owned()),
            goals: self.goals,
            home: self.home,
        }
    }
}

/// Response body for a created agent.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AgentCreated {
    /// Identity of the new agent.
    pub agent_id: AgentId,
    /// Its display name.
    pub name: String,
    /// Its personality.
    pub personality: String,
}

/// Add an agent through the simulation and describe the result.
pub(crate) async fn add_agent(
    state: &AppState,
    request: CreateAgentRequest,
) -> Result<AgentCreated, ObserverError> {
    let new = request.into_new_agent();
    let (name, personality) = (new.name.clone(), new.personality.clone());
    let agent_id = state.simulation.add_agent(new).await?;
    info!(%agent_id, agent = %name, "Added agent via observer");
    Ok(AgentCreated {
        agent_id,
        name,
        personality,
    })
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing simulation status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let world = state.simulation.snapshot().await;
    let name = state.simulation.name().to_owned();
    let model = state.simulation.model_name().to_owned();
    let tick = world.tick;
    let agent_count = world.agents.len();
    let building_count = world.buildings.len();
    let conversation_count = world.conversations.len();
    let (status_class, status) = if world.running {
        ("status", "RUNNING")
    } else {
        ("status stopped", "STOPPED")
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>{name} Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        .stopped {{ color: #f85149; }}
        .verb {{ color: #7ee787; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>{name}</h1>
    <p class="subtitle">Agents on a grid, thinking with {model}</p>

    <p>Status: <span class="{status_class}">{status}</span></p>

    <div>
        <div class="metric">
            <div class="label">Tick</div>
            <div class="value">{tick}</div>
        </div>
        <div class="metric">
            <div class="label">Agents</div>
            <div class="value">{agent_count}</div>
        </div>
        <div class="metric">
            <div class="label">Buildings</div>
            <div class="value">{building_count}</div>
        </div>
        <div class="metric">
            <div class="label">Conversations</div>
            <div class="value">{conversation_count}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><span class="verb">GET</span> <a href="/api/world">/api/world</a> -- Current world state</li>
        <li><span class="verb">GET</span> <a href="/api/agents">/api/agents</a> -- List all agents</li>
        <li><span class="verb">POST</span> /api/agents -- Add an agent</li>
        <li><span class="verb">GET</span> /api/agents/{{id}} -- Single agent detail</li>
        <li><span class="verb">GET</span> <a href="/api/simulation/status">/api/simulation/status</a> -- Loop status</li>
        <li><span class="verb">POST</span> /api/simulation/start -- Start the loop</li>
        <li><span class="verb">POST</span> /api/simulation/stop -- Stop the loop</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws</code> -- Live world updates and commands</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/world -- current world state
// ---------------------------------------------------------------------------

/// Return the current world state.
pub async fn get_world(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.simulation.snapshot().await)
}

// ---------------------------------------------------------------------------
// /api/agents
// ---------------------------------------------------------------------------

/// List agent summaries in joining order.
pub async fn list_agents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let world = state.simulation.snapshot().await;
    Json(serde_json::json!({
        "count": world.agents.len(),
        "agents": world.agents,
    }))
}

/// Add an agent. Missing fields fall back to `Anonymous` and `neutral`.
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAgentRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    Ok(Json(add_agent(&state, request).await?))
}

/// Return the full detail for a single agent.
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = parse_uuid(&id_str)?;
    let agent_id = AgentId::from(id);

    let detail = state
        .simulation
        .agent(agent_id)
        .await
        .ok_or_else(|| ObserverError::NotFound(format!("agent {id}")))?;
    Ok(Json(detail))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a UUID string, returning an [`ObserverError::InvalidUuid`] on failure.
fn parse_uuid(s: &str) -> Result<Uuid, ObserverError> {
    Uuid::parse_str(s).map_err(|e| ObserverError::InvalidUuid(format!("{s}: {e}")))
}
