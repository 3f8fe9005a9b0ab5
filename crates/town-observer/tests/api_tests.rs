//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use town_core::{NewAgent, ScriptedModel, Simulation, SimulationConfig};
use town_observer::router::build_router;
use town_observer::state::AppState;
use town_observer::ws::{ClientCommand, ServerEvent, execute};
use town_types::AgentId;

fn test_config() -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.world.tick_interval_ms = 10;
    config
}

async fn make_test_state(model: ScriptedModel) -> (Arc<AppState>, AgentId) {
    let simulation = Simulation::new(&test_config(), Arc::new(model)).unwrap();
    let agent_id = simulation
        .add_agent(NewAgent::new("Alice", "curious"))
        .await
        .unwrap();
    (Arc::new(AppState::new(Arc::new(simulation))), agent_id)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn index_returns_html() {
    let (state, _) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(state);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("STOPPED"));
    assert!(html.contains("/api/world"));
}

#[tokio::test]
async fn world_lists_buildings_and_agents() {
    let (state, agent_id) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(state);

    let response = app.oneshot(get("/api/world")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["width"], 50);
    assert_eq!(json["height"], 50);
    assert_eq!(json["tick"], 0);
    assert_eq!(json["running"], false);
    assert!(!json["buildings"].as_array().unwrap().is_empty());
    let agents = json["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["id"], agent_id.to_string());
    assert_eq!(agents[0]["current_action"], "standing");
}

#[tokio::test]
async fn list_agents_counts() {
    let (state, _) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(state);

    let json = body_to_json(app.oneshot(get("/api/agents")).await.unwrap().into_body()).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["agents"][0]["name"], "Alice");
}

#[tokio::test]
async fn create_agent_fills_defaults() {
    let (state, _) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(Arc::clone(&state));

    let response = app.oneshot(post("/api/agents", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Anonymous");
    assert_eq!(json["personality"], "neutral");

    let id: AgentId = json["agent_id"].as_str().unwrap().parse().unwrap();
    let detail = state.simulation.agent(id).await.unwrap();
    assert_eq!(detail.personality, "neutral");
    assert_eq!(state.simulation.snapshot().await.agents.len(), 2);
}

#[tokio::test]
async fn create_agent_in_unknown_home_is_rejected() {
    let (state, _) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(state);

    let response = app
        .oneshot(post("/api/agents", r#"{"name":"Bob","home":"castle9"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("castle9"));
}

#[tokio::test]
async fn get_agent_detail() {
    let (state, agent_id) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(state);

    let response = app
        .oneshot(get(&format!("/api/agents/{agent_id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Alice");
    assert_eq!(json["personality"], "curious");
    assert!(json["relationships"].as_array().unwrap().is_empty());
    assert!(json["building"].is_string());
}

#[tokio::test]
async fn get_agent_not_found() {
    let (state, _) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(state);

    let response = app
        .oneshot(get(&format!("/api/agents/{}", AgentId::new())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_agent_invalid_uuid() {
    let (state, _) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(state);

    let response = app.oneshot(get("/api/agents/not-a-uuid")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn start_twice_then_stop() {
    let (state, _) = make_test_state(ScriptedModel::replying("wait")).await;
    let app = build_router(Arc::clone(&state));

    let response = app
        .clone()
        .oneshot(post("/api/simulation/start", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["outcome"], "started");

    let json = body_to_json(
        app.clone()
            .oneshot(post("/api/simulation/start", ""))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["message"], "Simulation already running");

    let status = body_to_json(
        app.clone()
            .oneshot(get("/api/simulation/status"))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(status["running"], true);
    assert_eq!(status["agents"], 1);

    let json = body_to_json(
        app.clone()
            .oneshot(post("/api/simulation/stop", ""))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(json["outcome"], "stopped");
    assert!(!state.simulation.is_running());

    let json = body_to_json(
        app.oneshot(post("/api/simulation/stop", ""))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(json["outcome"], "not_running");
}

#[tokio::test]
async fn start_without_model_is_unavailable() {
    let model = ScriptedModel::replying("wait").not_ready("no API key configured");
    let (state, _) = make_test_state(model).await;
    let app = build_router(Arc::clone(&state));

    let response = app.oneshot(post("/api/simulation/start", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 503);
    assert!(!state.simulation.is_running());
}

#[tokio::test]
async fn socket_commands_answer_with_events() {
    let (state, _) = make_test_state(ScriptedModel::replying("wait")).await;

    let event = execute(&state, ClientCommand::GetWorldState).await;
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event"], "world_update");
    assert_eq!(json["data"]["agents"].as_array().unwrap().len(), 1);

    let command: ClientCommand =
        serde_json::from_str(r#"{"command":"add_agent","name":"Bob"}"#).unwrap();
    let ServerEvent::AgentAdded {
        name, personality, ..
    } = execute(&state, command).await
    else {
        panic!("expected agent_added");
    };
    assert_eq!(name, "Bob");
    assert_eq!(personality, "neutral");

    assert!(matches!(
        execute(&state, ClientCommand::StartSimulation).await,
        ServerEvent::SimulationStarted { .. }
    ));
    assert!(matches!(
        execute(&state, ClientCommand::StartSimulation).await,
        ServerEvent::SimulationAlreadyRunning { .. }
    ));
    assert!(matches!(
        execute(&state, ClientCommand::StopSimulation).await,
        ServerEvent::SimulationStopped { .. }
    ));
}

#[tokio::test]
async fn socket_start_failure_is_an_error_event() {
    let model = ScriptedModel::replying("wait").not_ready("no API key configured");
    let (state, _) = make_test_state(model).await;

    let json = serde_json::to_value(execute(&state, ClientCommand::StartSimulation).await).unwrap();
    assert_eq!(json["event"], "error");
    assert!(json["data"]["message"].as_str().unwrap().contains("no API key"));
}
