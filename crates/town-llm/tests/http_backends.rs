//! Integration tests for the HTTP backends against a local mock provider.
//!
//! The mock is a tiny axum app bound to an ephemeral port. It records the
//! headers and bodies it receives and can be told to fail the first few
//! requests.

#![allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic, clippy::arithmetic_side_effects)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use town_core::model::{ChatMessage, CompletionRequest, LanguageModel, ProviderError};
use town_llm::{BackendType, LlmBackend, LlmBackendConfig};

#[derive(Default)]
struct Mock {
    failures_left: Mutex<u32>,
    failure_status: Mutex<u16>,
    seen: Mutex<Vec<(HeaderMap, Value)>>,
}

async fn chat(State(mock): State<Arc<Mock>>, headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    mock.seen.lock().unwrap().push((headers, body));
    let mut failures = mock.failures_left.lock().unwrap();
    if *failures > 0 {
        *failures -= 1;
        let status = StatusCode::from_u16(*mock.failure_status.lock().unwrap()).unwrap();
        return (status, Json(json!({"error": "try later"})));
    }
    (
        StatusCode::OK,
        Json(json!({"choices": [{"message": {"role": "assistant", "content": " go to cafe "}}]})),
    )
}

async fn messages(State(mock): State<Arc<Mock>>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    mock.seen.lock().unwrap().push((headers, body));
    Json(json!({"content": [{"type": "text", "text": "Hello there!"}]}))
}

async fn serve(failures: u32, failure_status: u16) -> (String, Arc<Mock>) {
    let mock = Arc::new(Mock::default());
    *mock.failures_left.lock().unwrap() = failures;
    *mock.failure_status.lock().unwrap() = failure_status;
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .route("/v1/messages", post(messages))
        .with_state(Arc::clone(&mock));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/v1"), mock)
}

fn config(backend_type: BackendType, api_url: String, max_retries: u32) -> LlmBackendConfig {
    LlmBackendConfig {
        backend_type,
        api_url,
        api_key: String::from("test-key"),
        referer: Some(String::from("http://localhost:5000")),
        title: Some(String::from("AI Town")),
        max_retries,
        request_timeout: Duration::from_secs(5),
    }
}

fn request() -> CompletionRequest {
    CompletionRequest {
        model: String::from("openai/gpt-3.5-turbo"),
        messages: vec![
            ChatMessage::system("You are Alice. Be concise and natural."),
            ChatMessage::user("What should you do next?"),
        ],
        temperature: 0.7,
        max_tokens: 150,
    }
}

#[tokio::test]
async fn openai_backend_sends_attribution_headers() {
    let (url, mock) = serve(0, 500).await;
    let backend = LlmBackend::new(&config(BackendType::OpenAi, url, 0)).unwrap();

    let reply = backend.complete(&request()).await.unwrap();
    assert_eq!(reply, " go to cafe ");

    let seen = mock.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (headers, body) = &seen[0];
    assert_eq!(headers["authorization"], "Bearer test-key");
    assert_eq!(headers["http-referer"], "http://localhost:5000");
    assert_eq!(headers["x-title"], "AI Town");
    assert_eq!(body["model"], "openai/gpt-3.5-turbo");
    assert_eq!(body["max_tokens"], 150);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "What should you do next?");
}

#[tokio::test]
async fn server_errors_are_retried() {
    let (url, mock) = serve(2, 503).await;
    let backend = LlmBackend::new(&config(BackendType::OpenAi, url, 2)).unwrap();

    let reply = backend.complete(&request()).await.unwrap();
    assert_eq!(reply.trim(), "go to cafe");
    assert_eq!(mock.seen.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let (url, mock) = serve(5, 401).await;
    let backend = LlmBackend::new(&config(BackendType::OpenAi, url, 3)).unwrap();

    let err = backend.complete(&request()).await.unwrap_err();
    match err {
        ProviderError::Status { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("try later"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(mock.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn anthropic_backend_lifts_the_system_message() {
    let (url, mock) = serve(0, 500).await;
    let backend = LlmBackend::new(&config(BackendType::Anthropic, url, 0)).unwrap();
    assert_eq!(backend.name(), "anthropic");

    let reply = backend.complete(&request()).await.unwrap();
    assert_eq!(reply, "Hello there!");

    let seen = mock.seen.lock().unwrap();
    let (headers, body) = &seen[0];
    assert_eq!(headers["x-api-key"], "test-key");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["system"], "You are Alice. Be concise and natural.");
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["role"], "user");
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend =
        LlmBackend::new(&config(BackendType::OpenAi, format!("http://{addr}/v1"), 0)).unwrap();
    let err = backend.complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport(_)));
}
