//! Failure types and the terminal error translator.
//!
//! Handlers report failures by returning [`ApiError`]. Its
//! [`IntoResponse`] impl does not render anything for the client: it
//! produces a bare `500` carrying a private [`Failure`] extension.
//! Panics caught by `tower-http`'s `CatchPanicLayer` are turned into the
//! same shape by [`panic_failure`].
//!
//! [`translate_failures`] is the single place that consumes a
//! [`Failure`]. It logs the full detail and stack context at error level
//! through the injected [`LogContext`] and replaces the response with the
//! fixed body `{"detail": "An internal server error occurred."}`. Failure
//! detail never travels in a response body, so it cannot leak.
//!
//! A panic has already unwound by the time `CatchPanicLayer` sees it, so
//! its stack is recorded at the panic site by the hook that
//! [`install_panic_hook`] registers. The hook stashes the location and
//! backtrace in a thread-local slot that [`panic_failure`] drains on the
//! same thread.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;
use std::panic;
use std::sync::Once;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use crate::logging::RequestId;
use crate::telemetry::LogContext;

/// Client-visible body of every translated failure.
pub const INTERNAL_ERROR_DETAIL: &str = "An internal server error occurred.";

/// Errors a handler can return.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other unexpected condition.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Failure::new(FailureKind::Handler, self.to_string()).into_response()
    }
}

/// How a failure escaped its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The handler returned an error.
    Handler,
    /// The handler panicked.
    Panic,
}

impl FailureKind {
    /// Short label used in log entries.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Handler => "handler_error",
            Self::Panic => "panic",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a panic happened, captured by the panic hook.
#[derive(Debug, Clone)]
struct PanicSite {
    location: Option<String>,
    backtrace: String,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicSite>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Register the process panic hook that records panic sites for
/// [`panic_failure`].
///
/// Idempotent. The previously installed hook still runs after the site is
/// recorded.
pub fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let site = PanicSite {
                location: info.location().map(ToString::to_string),
                backtrace: Backtrace::force_capture().to_string(),
            };
            let _ = LAST_PANIC.try_with(|slot| slot.replace(Some(site)));
            previous(info);
        }));
    });
}

fn take_panic_site() -> Option<PanicSite> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}

/// Server-side record of an unhandled failure.
///
/// Travels as a response extension from the failing handler to
/// [`translate_failures`], which removes it.
#[derive(Debug, Clone)]
pub struct Failure {
    kind: FailureKind,
    detail: String,
    location: Option<String>,
    backtrace: String,
}

impl Failure {
    /// Record a failure of the given kind, capturing the current stack.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            location: None,
            backtrace: Backtrace::force_capture().to_string(),
        }
    }

    fn panicked(detail: String, site: Option<PanicSite>) -> Self {
        match site {
            Some(site) => Self {
                kind: FailureKind::Panic,
                detail,
                location: site.location,
                backtrace: site.backtrace,
            },
            None => Self::new(FailureKind::Panic, detail),
        }
    }

    /// How the failure escaped.
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Diagnostic detail, for the server log only.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Source location of a panic, when the panic hook recorded one.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Stack context captured where the failure was raised.
    pub fn backtrace(&self) -> &str {
        &self.backtrace
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// The fixed response every failure is translated into.
pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "detail": INTERNAL_ERROR_DETAIL })),
    )
        .into_response()
}

/// Convert a caught panic payload into a [`Failure`] response.
///
/// Installed with `CatchPanicLayer::custom`. Picks up the panic site
/// recorded on this thread by [`install_panic_hook`]; without it the
/// backtrace is taken here instead.
pub fn panic_failure(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| (*s).to_owned()))
        .unwrap_or_else(|| String::from("panic with non-string payload"));
    Failure::panicked(detail, take_panic_site()).into_response()
}

/// Terminal failure translation middleware.
///
/// Passes through every response without a [`Failure`] extension
/// untouched, including intentional error statuses such as `404` or
/// `422`.
pub async fn translate_failures(
    State(logs): State<LogContext>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map_or_else(|| String::from("-"), ToString::to_string);

    let mut response = next.run(request).await;

    let Some(failure) = response.extensions_mut().remove::<Failure>() else {
        return response;
    };

    logs.in_scope(|| {
        error!(
            request_id = %request_id,
            %method,
            path = %path,
            kind = %failure.kind(),
            detail = failure.detail(),
            location = failure.location().unwrap_or("-"),
            backtrace = failure.backtrace(),
            "unhandled failure for {method} {path}"
        );
    });

    internal_error_response()
}
