//! Logging context shared by the request logger and the error translator.
//!
//! A [`LogContext`] wraps a [`tracing::Dispatch`] built once at startup.
//! Pipeline middleware log through [`LogContext::in_scope`] so the sink
//! is always the injected one, never whatever global subscriber happens
//! to be installed.
//!
//! Production contexts write to two destinations:
//!
//! - the console (stderr), filtered by `RUST_LOG` or the configured level
//! - a [`RollingFile`] under the configured directory
//!
//! Tests use [`LogContext::in_memory`], which captures JSON lines in a
//! [`MemoryWriter`].

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::level_filters::LevelFilter;
use tracing::{Dispatch, Subscriber};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LogFormat, LoggingConfig};
use crate::rolling::RollingFile;

/// Errors that can occur when building or installing a logging context.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured level is not a valid level name.
    #[error("invalid log level {level:?}: {reason}")]
    InvalidLevel {
        /// The rejected level string.
        level: String,
        /// Parser message.
        reason: String,
    },

    /// A global default subscriber was already installed.
    #[error("global logging context already installed: {source}")]
    AlreadyInstalled {
        /// The dispatcher's refusal.
        #[from]
        source: tracing::dispatcher::SetGlobalDefaultError,
    },
}

/// Explicitly constructed logging context.
///
/// Cheap to clone; clones share the same sink.
#[derive(Debug, Clone)]
pub struct LogContext {
    dispatch: Dispatch,
}

impl LogContext {
    /// Wrap an existing dispatcher.
    pub const fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Build the console + rolling file context described by `config`.
    pub fn from_config(config: &LoggingConfig) -> Result<Self, TelemetryError> {
        let level = config
            .level
            .parse::<LevelFilter>()
            .map_err(|e| TelemetryError::InvalidLevel {
                level: config.level.clone(),
                reason: e.to_string(),
            })?;

        let console_filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let file = RollingFile::new(
            &config.directory,
            config.file_name.clone(),
            config.max_file_bytes,
            config.retention_days,
        );

        let subscriber = tracing_subscriber::registry()
            .with(console_layer(config.format).with_filter(console_filter))
            .with(file_layer(config.format, file).with_filter(level));

        Ok(Self::new(Dispatch::new(subscriber)))
    }

    /// Build a context that records JSON lines in memory.
    ///
    /// Returns the context together with a handle to the captured output.
    pub fn in_memory() -> (Self, MemoryWriter) {
        let writer = MemoryWriter::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(LevelFilter::TRACE)
            .with_writer(writer.clone())
            .finish();
        (Self::new(Dispatch::new(subscriber)), writer)
    }

    /// Install this context as the process-wide default so that logging
    /// outside the request pipeline (startup, shutdown) reaches the same
    /// sink.
    pub fn install_global(&self) -> Result<(), TelemetryError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())?;
        Ok(())
    }

    /// Run `f` with this context as the active dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// The underlying dispatcher.
    pub const fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
    }
}

fn file_layer<S>(format: LogFormat, file: RollingFile) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(file)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(file).boxed(),
    }
}

/// In-memory log sink.
///
/// Every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryWriter {
    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Captured lines parsed as JSON objects. Lines that are not JSON are
    /// skipped.
    pub fn entries(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl io::Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for MemoryWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
