//! Observer server startup helper for the host binary.
//!
//! [`spawn_observer`] binds eagerly, so a taken port fails startup
//! instead of a background task, then serves on its own Tokio task.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// A running observer.
#[derive(Debug)]
pub struct ObserverHandle {
    /// The address actually bound (port `0` resolves here).
    pub addr: SocketAddr,
    /// The serving task. Abort it to shut the observer down.
    pub task: JoinHandle<()>,
}

/// Bind `config` and serve the Observer on a background task.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address is malformed or cannot
/// be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<ObserverHandle, StartupError> {
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let task = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(ObserverHandle { addr, task })
}
