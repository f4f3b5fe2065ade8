//! REST API endpoint handlers.
//!
//! Every handler returns static data; none reads request input or
//! shared state.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and service identity |
//! | `GET` | `/` | API information and links |
//! | `GET` | `/api/chapters` | List textbook chapters |
//! | `GET` | `/api/modules` | List course modules |

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;

/// Service name reported by `GET /health`.
pub const SERVICE_NAME: &str = "physical-ai-textbook-api";

/// Service version reported by `GET /health`.
pub const SERVICE_VERSION: &str = "1.0.0";

/// Body of `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// Always `healthy` while the process serves requests.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Body of `GET /`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiInfo {
    /// Human-readable API name.
    pub message: &'static str,
    /// Path of the API documentation.
    pub docs: &'static str,
    /// Path of the health check.
    pub health: &'static str,
}

/// A textbook chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chapter {
    /// Stable chapter identifier.
    pub id: &'static str,
    /// Chapter title.
    pub title: &'static str,
    /// Name of the module the chapter belongs to.
    pub module: &'static str,
}

/// A course module grouping chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CourseModule {
    /// Stable module identifier.
    pub id: &'static str,
    /// Module title.
    pub title: &'static str,
}

/// Chapters served by `GET /api/chapters`.
pub const CHAPTERS: &[Chapter] = &[Chapter {
    id: "ch1",
    title: "Introduction to Physical AI",
    module: "Module 1",
}];

/// Modules served by `GET /api/modules`.
pub const MODULES: &[CourseModule] = &[CourseModule {
    id: "mod1",
    title: "Module 1: ROS 2 Fundamentals",
}];

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report that the service is up.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        service: SERVICE_NAME,
        version: SERVICE_VERSION,
    })
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Describe the API and point at the docs and health endpoints.
pub async fn root() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "Physical AI Textbook API",
        docs: "/docs",
        health: "/health",
    })
}

// ---------------------------------------------------------------------------
// GET /api/chapters, GET /api/modules
// ---------------------------------------------------------------------------

/// List all chapters.
pub async fn list_chapters() -> Result<impl IntoResponse, ApiError> {
    Ok(Json(serde_json::to_value(CHAPTERS)?))
}

/// List all modules.
pub async fn list_modules() -> Result<impl IntoResponse, ApiError> {
    Ok(Json(serde_json::to_value(MODULES)?))
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Answer any unregistered method or path.
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "detail": "Not Found" })),
    )
}
