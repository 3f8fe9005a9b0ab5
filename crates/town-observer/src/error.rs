//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use town_core::SimulationError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The request asked for something impossible.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request conflicts with the current world.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A collaborator the request depends on is unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SimulationError> for ObserverError {
    fn from(error: SimulationError) -> Self {
        match error {
            SimulationError::UnknownAgent(id) => Self::NotFound(format!("agent {id}")),
            SimulationError::UnknownBuilding(_) => Self::InvalidRequest(error.to_string()),
            SimulationError::TownFull => Self::Conflict(error.to_string()),
            SimulationError::NotReady { .. } => Self::Unavailable(error.to_string()),
            SimulationError::Config { .. }
            | SimulationError::World { .. }
            | SimulationError::Prompt { .. } => Self::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::InvalidUuid(msg) | Self::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
