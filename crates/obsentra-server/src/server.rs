//! Relay server lifecycle management.
//!
//! [`start_server`] binds the configured address and serves until
//! `Ctrl-C`; [`serve`] runs on an already bound listener with a caller
//! supplied shutdown future.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use obsentra_core::config::ServerSection;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::router::build_router;
use crate::state::AppState;

/// Start the relay server.
///
/// Binds to the configured address and serves requests until `Ctrl-C`.
/// Returns `Ok(())` on clean shutdown.
///
/// # Errors
///
/// Returns an error if the address is invalid, the TCP listener cannot
/// bind, or the server encounters a fatal I/O error.
pub async fn start_server(config: &ServerSection, state: Arc<AppState>) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, "Obsentra relay listening");

    serve(listener, state, shutdown_signal()).await
}

/// Serve the relay on an already bound listener.
///
/// When `shutdown` resolves the relay stops accepting subscribers, every
/// current one is disconnected, and the server drains in-flight requests
/// before returning.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the server hits a fatal I/O error.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let relay = Arc::clone(&state.relay);
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            // Open sockets would otherwise hold the graceful drain forever.
            relay.shut_down();
        })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Obsentra relay stopped");
    Ok(())
}

/// Resolves on `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Errors that can occur when starting or running the relay server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}
