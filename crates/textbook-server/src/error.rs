//! Error types for the server binary.
//!
//! [`AppError`] wraps every failure mode of startup and serving so
//! `main` can propagate with `?`.

use textbook_api::config::ConfigError;
use textbook_api::server::ServerError;
use textbook_api::telemetry::TelemetryError;

/// Top-level error for the server binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The logging context could not be built or installed.
    #[error("logging error: {source}")]
    Telemetry {
        /// The underlying telemetry error.
        #[from]
        source: TelemetryError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: ServerError,
    },
}
