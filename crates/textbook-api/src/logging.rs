//! Request logger middleware.
//!
//! [`log_requests`] wraps the whole dispatch path. It logs one entry
//! when a request arrives (method, path) and one when its response
//! leaves (status, elapsed time). Both carry the same [`RequestId`], which
//! is also inserted into the request extensions for the error
//! translator.
//!
//! Failures inside the pipeline are already converted into responses by
//! the time control returns here, so the outbound entry is written for
//! every request that completes.

use std::fmt;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

use crate::telemetry::LogContext;

/// Correlates the inbound and outbound log entries of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Log every request before dispatch and its response after.
pub async fn log_requests(
    State(logs): State<LogContext>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = RequestId::new();
    request.extensions_mut().insert(request_id);

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    logs.in_scope(|| {
        info!(%request_id, %method, path = %path, "Request: {method} {path}");
    });

    let started = Instant::now();
    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    logs.in_scope(|| {
        info!(%request_id, status, elapsed_ms, "Response: {status}");
    });

    response
}
