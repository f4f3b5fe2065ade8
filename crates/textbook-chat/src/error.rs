//! Error types for the mock chat module.
//!
//! Every [`ChatError`] is a client mistake and renders as `422` with a
//! `{"detail": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Errors the chat endpoints report to the client.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The body was not JSON of the expected shape.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// The body parsed but failed validation.
    #[error("invalid query: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.to_string() });
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    }
}
