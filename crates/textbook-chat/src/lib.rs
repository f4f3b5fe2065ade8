//! Mock chat module for the Physical AI Textbook API.
//!
//! Stands in for the retrieval-augmented chatbot while the real one is
//! unavailable. It answers with canned text and fixed sources, so the
//! website's chat widget can be exercised end to end.
//!
//! The module is self-contained: [`router`] returns an Axum [`Router`]
//! meant to be nested under `/api/chat`. It does not depend on the API
//! crate's pipeline.
//!
//! # Endpoints (relative to the mount point)
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Mock status |
//! | `POST` | `/query` | Canned answer to a question |

pub mod error;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

pub use error::ChatError;
pub use handlers::{ChatAnswer, ChatQuery, Source};

/// Build the chat router, to be nested under a prefix.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/query", post(handlers::query))
}
