//! Server binary for the Physical AI Textbook API.
//!
//! Wires the request pipeline from `textbook-api` to the mock chat
//! module from `textbook-chat` and serves it.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`textbook-api.toml`, `TEXTBOOK_*` variables)
//! 2. Build the logging context (console + rolling file) and install it
//!    as the process default
//! 3. Warn about a CORS allow-list that mixes `*` with specific origins
//! 4. Build the router with the mock chat module under `/api/chat`
//! 5. Serve until `Ctrl-C`

mod error;

use textbook_api::config::ApiConfig;
use textbook_api::cors::OriginPolicy;
use textbook_api::router::{build_router, CHAT_PREFIX};
use textbook_api::server::start_server;
use textbook_api::telemetry::LogContext;
use tracing::{info, warn};

use crate::error::AppError;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging setup, binding or serving
/// fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let config = ApiConfig::load()?;

    // 2. Initialize logging.
    let logs = LogContext::from_config(&config.logging)?;
    logs.install_global()?;

    info!(
        host = config.server.host,
        port = config.server.port,
        log_directory = config.logging.directory,
        log_file = config.logging.file_name,
        "textbook-server starting"
    );

    // 3. Flag the CORS configuration concern without rewriting it.
    if OriginPolicy::from_config(&config.cors).has_wildcard_mix() {
        warn!(
            origins = ?config.cors.allowed_origins,
            "CORS allow-list contains \"*\" alongside specific origins; every origin is allowed"
        );
    }

    // 4. Build the router.
    let router = build_router(logs, &config.cors, textbook_chat::router());
    info!(chat_prefix = CHAT_PREFIX, "Mock chat module mounted");

    // 5. Serve.
    start_server(&config.server, router).await?;

    info!("textbook-server stopped");
    Ok(())
}
