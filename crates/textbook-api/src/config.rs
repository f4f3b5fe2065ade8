//! Configuration loading and typed config structures for the API server.
//!
//! Values are layered with the `config` crate, later sources winning:
//!
//! 1. Built-in defaults (the `Default` impls below)
//! 2. An optional file, `textbook-api.toml` / `.yaml` by default, or the
//!    path (without extension) named by `TEXTBOOK_CONFIG`
//! 3. Environment variables prefixed with `TEXTBOOK_`, using `__` between
//!    section and key (e.g. `TEXTBOOK_SERVER__PORT=9000`). Lists are
//!    comma-separated.

use std::collections::HashMap;

use config::{Environment, File, FileFormat};
use serde::Deserialize;

/// Environment variable naming the configuration file to load.
pub const CONFIG_PATH_ENV: &str = "TEXTBOOK_CONFIG";

/// Configuration file looked up when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "textbook-api";

/// Prefix shared by all configuration environment variables.
const ENV_PREFIX: &str = "TEXTBOOK";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape.
    #[error("failed to load config: {source}")]
    Load {
        /// The underlying `config` crate error.
        #[from]
        source: config::ConfigError,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level API server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Console and file log sink settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Cross-origin policy.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl ApiConfig {
    /// Load configuration from the file named by [`CONFIG_PATH_ENV`] (or
    /// [`DEFAULT_CONFIG_FILE`]) plus the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_owned());
        Self::load_from(&path, None)
    }

    /// Load configuration from `path` (extension optional, the file may be
    /// missing) layered under environment variables.
    ///
    /// When `env` is `Some`, those variables are used instead of the
    /// process environment.
    pub fn load_from(
        path: &str,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(environment(env))
            .build()?;
        Self::finish(settings)
    }

    /// Parse configuration from a TOML string layered under `env`.
    pub fn parse_toml(
        toml: &str,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .add_source(environment(env))
            .build()?;
        Self::finish(settings)
    }

    fn finish(settings: config::Config) -> Result<Self, ConfigError> {
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid(String::from("server.port must be non-zero")));
        }
        if self.logging.max_file_bytes == 0 {
            return Err(ConfigError::Invalid(String::from(
                "logging.max_file_bytes must be non-zero",
            )));
        }
        if self.logging.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "logging.file_name must not be empty",
            )));
        }
        Ok(())
    }
}

fn environment(vars: Option<HashMap<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("cors.allowed_origins")
        .try_parsing(true)
        .source(vars)
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8000,
        }
    }
}

/// Output format of the console sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Log sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level (trace, debug, info, warn, error). `RUST_LOG`
    /// overrides it for the console.
    pub level: String,
    /// Console output format.
    pub format: LogFormat,
    /// Directory holding the active log file and its rotated siblings.
    pub directory: String,
    /// Name of the active log file.
    pub file_name: String,
    /// Size at which the active file is rotated.
    pub max_file_bytes: u64,
    /// Rotated files older than this many days are deleted.
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: LogFormat::Pretty,
            directory: String::from("logs"),
            file_name: String::from("backend.log"),
            max_file_bytes: 10 * 1024 * 1024,
            retention_days: 7,
        }
    }
}

/// Cross-origin policy configuration.
///
/// Entries in `allowed_origins` are exact origins, `scheme://*.suffix`
/// subdomain patterns, or `*` for any origin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to make browser requests.
    pub allowed_origins: Vec<String>,
    /// Whether `Access-Control-Allow-Credentials: true` is sent.
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: [
                "http://localhost:3000",
                "http://localhost:3001",
                "https://shahzeenasamad-physical-ai-frontend.vercel.app",
                "https://*.vercel.app",
                "https://*.hf.space",
                "*",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            allow_credentials: true,
        }
    }
}
