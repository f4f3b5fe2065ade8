//! Axum router construction.
//!
//! [`build_router`] assembles the static route table and the chat mount
//! into a single [`Router`] wrapped in the request pipeline:
//!
//! ```text
//! log_requests            (outermost: one entry in, one entry out)
//!   CORS
//!     translate_failures  (Failure extension -> fixed 500)
//!       CatchPanicLayer   (panic -> Failure extension)
//!         routes + /api/chat + 404 fallback
//! ```

use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::CorsConfig;
use crate::cors::cors_layer;
use crate::error::{install_panic_hook, panic_failure, translate_failures};
use crate::handlers;
use crate::logging::log_requests;
use crate::telemetry::LogContext;

/// Path prefix the chat module is nested under.
pub const CHAT_PREFIX: &str = "/api/chat";

/// A component that can be nested under a path prefix and handles its own
/// requests.
///
/// The pipeline never looks inside a mounted component; it only forwards
/// matching requests and returns the component's responses.
pub trait Mountable {
    /// Produce the router to nest.
    fn into_router(self) -> Router;
}

impl Mountable for Router {
    fn into_router(self) -> Router {
        self
    }
}

/// The static route table.
///
/// - `GET /health`
/// - `GET /`
/// - `GET /api/chapters`
/// - `GET /api/modules`
pub fn routes() -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/chapters", get(handlers::list_chapters))
        .route("/api/modules", get(handlers::list_modules))
}

/// Build the complete application router.
pub fn build_router(logs: LogContext, cors: &CorsConfig, chat: impl Mountable) -> Router {
    with_pipeline(
        routes().nest(CHAT_PREFIX, chat.into_router()),
        logs,
        cors,
    )
}

/// Wrap `routes` in the request pipeline.
///
/// Unmatched paths, and known paths requested with an unregistered
/// method, answer `404`. Also registers the panic hook that records stack
/// context for caught panics.
pub fn with_pipeline(routes: Router, logs: LogContext, cors: &CorsConfig) -> Router {
    install_panic_hook();
    routes
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .layer(CatchPanicLayer::custom(panic_failure))
        .layer(middleware::from_fn_with_state(logs.clone(), translate_failures))
        .layer(cors_layer(cors))
        .layer(middleware::from_fn_with_state(logs, log_requests))
}
