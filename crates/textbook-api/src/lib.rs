//! HTTP request pipeline for the Physical AI Textbook API.
//!
//! This crate provides the Axum application behind the textbook website:
//!
//! - **Static routes** (`/health`, `/`, `/api/chapters`, `/api/modules`)
//!   returning fixed JSON payloads
//! - **Chat mount point** (`/api/chat`) for any [`Mountable`] chat module
//! - **Request logger** emitting one entry before and one after every
//!   dispatch
//! - **Error translator** turning every handler failure or panic into a
//!   uniform `500` with a fixed, non-diagnostic body
//!
//! # Architecture
//!
//! ```text
//! request --> log_requests --> CORS --> translate_failures --> catch panic --> route table
//! ```
//!
//! Logging goes through an explicitly constructed [`LogContext`] rather
//! than ambient global state, so tests can swap in an in-memory sink.
//!
//! [`Mountable`]: router::Mountable
//! [`LogContext`]: telemetry::LogContext

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod rolling;
pub mod router;
pub mod server;
pub mod telemetry;

// Re-export primary types for convenience.
pub use config::ApiConfig;
pub use error::ApiError;
pub use router::{build_router, Mountable};
pub use server::{start_server, ServerError};
pub use telemetry::LogContext;
