//! Mock chat endpoint handlers.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::error::ChatError;

/// Longest accepted question, in characters.
pub const MAX_MESSAGE_CHARS: u64 = 2000;

/// Longest accepted text selection, in characters.
pub const MAX_SELECTION_CHARS: u64 = 5000;

/// Body of `POST /query`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatQuery {
    /// The reader's question.
    #[validate(length(min = 1, max = MAX_MESSAGE_CHARS))]
    pub message: String,
    /// Conversation to continue; a new one is started when absent.
    pub session_id: Option<String>,
    /// Passage the reader highlighted in the textbook, if any.
    #[validate(length(max = MAX_SELECTION_CHARS))]
    pub selected_text: Option<String>,
}

/// A textbook location cited by an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Source {
    /// Cited chapter.
    pub chapter_id: &'static str,
    /// Title of the cited chapter.
    pub title: &'static str,
}

/// Body of a successful `POST /query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatAnswer {
    /// Canned answer text.
    pub answer: String,
    /// Cited sources.
    pub sources: Vec<Source>,
    /// Conversation identifier to send with follow-up questions.
    pub session_id: String,
    /// Always `true`; lets the client tell mock answers apart.
    pub mock: bool,
}

const MOCK_SOURCES: &[Source] = &[Source {
    chapter_id: "ch1",
    title: "Introduction to Physical AI",
}];

/// `GET /health`: report that the mock is serving.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "mode": "mock",
    }))
}

/// `POST /query`: answer a question with canned text.
pub async fn query(
    payload: Result<Json<ChatQuery>, JsonRejection>,
) -> Result<Json<ChatAnswer>, ChatError> {
    let Json(query) = payload.map_err(|e| ChatError::InvalidBody(e.body_text()))?;
    query.validate()?;

    let session_id = query
        .session_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    debug!(session_id = %session_id, "Mock chat query answered");

    Ok(Json(ChatAnswer {
        answer: mock_answer(&query),
        sources: MOCK_SOURCES.to_vec(),
        session_id,
        mock: true,
    }))
}

fn mock_answer(query: &ChatQuery) -> String {
    let question = query.message.trim();
    match query.selected_text.as_deref().map(str::trim) {
        Some(selection) if !selection.is_empty() => format!(
            "This is a mock response about the selected text \"{selection}\". \
             You asked: \"{question}\". The full assistant will answer from the \
             textbook content once it is connected."
        ),
        _ => format!(
            "This is a mock response. You asked: \"{question}\". The full \
             assistant will answer from the textbook content once it is connected."
        ),
    }
}
