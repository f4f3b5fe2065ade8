//! HTTP server lifecycle management.
//!
//! [`start_server`] binds to the configured address and serves the
//! router until `Ctrl-C`. [`bind`] and [`serve`] are exposed separately
//! so callers (and tests) can bind an ephemeral port first.

use std::future::Future;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Bind a TCP listener to the configured address.
///
/// `host` may be an IPv4 or IPv6 literal or a resolvable name such as
/// `localhost`.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| ServerError::Bind(format!("{}:{}: {e}", config.host, config.port)))
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Textbook API listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))
}

/// Start the HTTP server.
///
/// Binds to the configured address and serves requests until `Ctrl-C`.
/// Returns `Ok(())` on clean shutdown.
pub async fn start_server(config: &ServerConfig, router: Router) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    serve(listener, router, shutdown_signal()).await
}

/// Resolve when the process receives `Ctrl-C`.
///
/// If the signal handler cannot be installed the server keeps running.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutdown signal disabled");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
