//! `WebSocket` handler for live world updates and client commands.
//!
//! Clients connect to `GET /ws`, receive the current world state at once,
//! and then every snapshot the simulation publishes. Each frame is a JSON
//! [`ServerEvent`]. Clients may send [`ClientCommand`] frames to query the
//! world, start or stop the loop, and add agents.
//!
//! If a client falls behind, lagged snapshots are skipped and the client
//! resumes from the most recent one.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use town_types::{AgentId, WorldState};
use tracing::{debug, warn};

use crate::control::{start_message, stop_message};
use crate::handlers::{self, CreateAgentRequest};
use crate::state::AppState;

/// A frame pushed to `WebSocket` clients.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A world snapshot.
    WorldUpdate(Box<WorldState>),
    /// The tick loop was started by this client.
    SimulationStarted {
        /// Human-readable message.
        message: String,
    },
    /// The tick loop was already running.
    SimulationAlreadyRunning {
        /// Human-readable message.
        message: String,
    },
    /// The tick loop was stopped.
    SimulationStopped {
        /// Human-readable message.
        message: String,
    },
    /// An agent joined at this client's request.
    AgentAdded {
        /// Identity of the new agent.
        agent_id: AgentId,
        /// Its display name.
        name: String,
        /// Its personality.
        personality: String,
    },
    /// A command failed.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl ServerEvent {
    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// A command sent by a `WebSocket` client.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Ask for the current world state.
    GetWorldState,
    /// Start the tick loop.
    StartSimulation,
    /// Stop the tick loop.
    StopSimulation,
    /// Add an agent; fields default like `POST /api/agents`.
    AddAgent(CreateAgentRequest),
}

/// Upgrade an HTTP request to a `WebSocket` connection.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_world(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Carry out one client command and produce the reply.
pub async fn execute(state: &AppState, command: ClientCommand) -> ServerEvent {
    match command {
        ClientCommand::GetWorldState => {
            ServerEvent::WorldUpdate(Box::new(state.simulation.snapshot().await))
        }
        ClientCommand::StartSimulation => match state.simulation.start().await {
            Ok(outcome @ town_core::StartOutcome::Started) => ServerEvent::SimulationStarted {
                message: start_message(outcome).to_owned(),
            },
            Ok(outcome @ town_core::StartOutcome::AlreadyRunning) => {
                ServerEvent::SimulationAlreadyRunning {
                    message: start_message(outcome).to_owned(),
                }
            }
            Err(e) => ServerEvent::error(e.to_string()),
        },
        ClientCommand::StopSimulation => {
            let outcome = state.simulation.stop().await;
            ServerEvent::SimulationStopped {
                message: stop_message(outcome).to_owned(),
            }
        }
        ClientCommand::AddAgent(request) => match handlers::add_agent(state, request).await {
            Ok(created) => ServerEvent::AgentAdded {
                agent_id: created.agent_id,
                name: created.name,
                personality: created.personality,
            },
            Err(e) => ServerEvent::error(e.to_string()),
        },
    }
}

/// Serialize and send one event. Returns `false` once the client is gone.
async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize server event: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

/// Handle the `WebSocket` lifecycle: greet with the current world,
/// forward published snapshots, and answer client commands.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("WebSocket client connected");

    let mut rx = state.subscribe();
    let greeting = ServerEvent::WorldUpdate(Box::new(state.simulation.snapshot().await));
    if !send_event(&mut socket, &greeting).await {
        debug!("WebSocket client disconnected before greeting");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(world) => {
                        let event = ServerEvent::WorldUpdate(Box::new(world));
                        if !send_event(&mut socket, &event).await {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<ClientCommand>(text.as_str()) {
                            Ok(command) => {
                                debug!(?command, "WebSocket command");
                                execute(&state, command).await
                            }
                            Err(e) => ServerEvent::error(format!("unrecognised command: {e}")),
                        };
                        if !send_event(&mut socket, &reply).await {
                            debug!("WebSocket client disconnected (reply failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn events_are_tagged_with_data() {
        let event = ServerEvent::SimulationStopped {
            message: "Simulation stopped".to_owned(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "simulation_stopped");
        assert_eq!(json["data"]["message"], "Simulation stopped");

        let error = serde_json::to_value(ServerEvent::error("boom")).unwrap();
        assert_eq!(error["event"], "error");
        assert_eq!(error["data"]["message"], "boom");
    }

    #[test]
    fn commands_parse_flat() {
        let command: ClientCommand = serde_json::from_str(
            r#"{"command":"add_agent","name":"Ada","goals":["paint"]}"#,
        )
        .unwrap();
        let ClientCommand::AddAgent(request) = command else {
            panic!("expected add_agent");
        };
        assert_eq!(request.name.as_deref(), Some("Ada"));
        assert!(request.personality.is_none());
        assert_eq!(request.goals, vec!["paint".to_owned()]);

        assert!(matches!(
            serde_json::from_str::<ClientCommand>(r#"{"command":"start_simulation"}"#).unwrap(),
            ClientCommand::StartSimulation
        ));
        assert!(serde_json::from_str::<ClientCommand>(r#"{"command":"dance"}"#).is_err());
    }
}
