//! Integration tests for the request pipeline: failure translation and
//! request logging.
//!
//! Failing handlers are test doubles wrapped in the same pipeline as the
//! real routes. Log output is captured with an in-memory logging context.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use textbook_api::config::{CorsConfig, LogFormat, LoggingConfig};
use textbook_api::error::ApiError;
use textbook_api::router::{build_router, routes, with_pipeline};
use textbook_api::telemetry::{LogContext, MemoryWriter};
use tower::ServiceExt;

const SECRET: &str = "connection string postgres://admin:hunter2@db";

async fn failing_handler() -> Result<&'static str, ApiError> {
    Err(ApiError::Internal(String::from(SECRET)))
}

async fn panicking_handler() -> &'static str {
    panic!("{SECRET}");
}

fn make_router() -> (Router, MemoryWriter) {
    let (logs, writer) = LogContext::in_memory();
    let app = routes()
        .route("/boom", get(failing_handler))
        .route("/panic", get(panicking_handler));
    (with_pipeline(app, logs, &CorsConfig::default()), writer)
}

async fn send(router: Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn messages_starting_with<'a>(entries: &'a [Value], prefix: &str) -> Vec<&'a Value> {
    entries
        .iter()
        .filter(|e| {
            e["fields"]["message"]
                .as_str()
                .is_some_and(|m| m.starts_with(prefix))
        })
        .collect()
}

// =========================================================================
// Error translation
// =========================================================================

#[tokio::test]
async fn test_handler_error_becomes_fixed_500() {
    let (router, _) = make_router();
    let (status, body) = send(router, "/boom").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, json!({"detail": "An internal server error occurred."}));
    assert!(!body.contains("hunter2"));
}

#[tokio::test]
async fn test_panic_becomes_fixed_500() {
    let (router, _) = make_router();
    let (status, body) = send(router, "/panic").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json, json!({"detail": "An internal server error occurred."}));
    assert!(!body.contains("hunter2"));
}

#[tokio::test]
async fn test_router_survives_panic() {
    let (router, _) = make_router();

    let (status, _) = send(router.clone(), "/panic").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = send(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthy"));
}

#[tokio::test]
async fn test_failing_chat_module_is_translated() {
    let (logs, _) = LogContext::in_memory();
    let chat = Router::new().route("/query", get(failing_handler));
    let router = build_router(logs, &CorsConfig::default(), chat);

    let (status, body) = send(router, "/api/chat/query").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, r#"{"detail":"An internal server error occurred."}"#);
}

#[tokio::test]
async fn test_failure_detail_is_logged_at_error_level() {
    let (router, writer) = make_router();
    send(router, "/boom").await;

    let entries = writer.entries();
    let errors: Vec<&Value> = entries.iter().filter(|e| e["level"] == "ERROR").collect();
    assert_eq!(errors.len(), 1);

    let fields = &errors[0]["fields"];
    assert_eq!(fields["method"], "GET");
    assert_eq!(fields["path"], "/boom");
    assert_eq!(fields["kind"], "handler_error");
    assert!(fields["detail"].as_str().unwrap().contains("hunter2"));
    assert!(!fields["backtrace"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_panic_detail_is_logged() {
    let (router, writer) = make_router();
    send(router, "/panic").await;

    let entries = writer.entries();
    let errors: Vec<&Value> = entries.iter().filter(|e| e["level"] == "ERROR").collect();
    assert_eq!(errors.len(), 1);
    let fields = &errors[0]["fields"];
    assert_eq!(fields["kind"], "panic");
    assert!(fields["detail"].as_str().unwrap().contains("hunter2"));
    assert!(
        fields["location"]
            .as_str()
            .unwrap()
            .contains("pipeline_tests.rs")
    );
    assert!(!fields["backtrace"].as_str().unwrap().is_empty());
}

// =========================================================================
// Request logging
// =========================================================================

#[tokio::test]
async fn test_request_logs_one_entry_before_and_after() {
    let (router, writer) = make_router();
    send(router, "/health").await;

    let entries = writer.entries();
    assert_eq!(entries.len(), 2);

    let before = &entries[0]["fields"];
    assert_eq!(entries[0]["level"], "INFO");
    assert_eq!(before["message"], "Request: GET /health");
    assert_eq!(before["method"], "GET");
    assert_eq!(before["path"], "/health");

    let after = &entries[1]["fields"];
    assert_eq!(entries[1]["level"], "INFO");
    assert_eq!(after["message"], "Response: 200");
    assert_eq!(after["status"], 200);

    assert_eq!(before["request_id"], after["request_id"]);
}

#[tokio::test]
async fn test_failure_path_still_logs_before_and_after() {
    for uri in ["/boom", "/panic"] {
        let (router, writer) = make_router();
        send(router, uri).await;

        let entries = writer.entries();
        let before = messages_starting_with(&entries, "Request: ");
        let after = messages_starting_with(&entries, "Response: ");
        assert_eq!(before.len(), 1, "{uri}");
        assert_eq!(after.len(), 1, "{uri}");
        assert_eq!(before[0]["fields"]["path"], uri);
        assert_eq!(after[0]["fields"]["status"], 500);

        // The error entry sits between the two and shares the request id.
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1]["level"], "ERROR");
        assert_eq!(
            entries[1]["fields"]["request_id"],
            before[0]["fields"]["request_id"]
        );
    }
}

#[tokio::test]
async fn test_not_found_is_logged() {
    let (router, writer) = make_router();
    send(router, "/missing").await;

    let entries = writer.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["fields"]["path"], "/missing");
    assert_eq!(entries[1]["fields"]["status"], 404);
}

#[tokio::test]
async fn test_each_request_gets_its_own_id() {
    let (router, writer) = make_router();
    send(router.clone(), "/health").await;
    send(router, "/api/modules").await;

    let entries = writer.entries();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0]["fields"]["request_id"], entries[1]["fields"]["request_id"]);
    assert_eq!(entries[2]["fields"]["request_id"], entries[3]["fields"]["request_id"]);
    assert_ne!(entries[0]["fields"]["request_id"], entries[2]["fields"]["request_id"]);
}

#[tokio::test]
async fn test_broken_log_sink_does_not_fail_requests() {
    let blocker = std::env::temp_dir().join(format!("textbook-blocker-{}", uuid::Uuid::new_v4()));
    std::fs::write(&blocker, b"not a directory").unwrap();

    let config = LoggingConfig {
        directory: blocker.join("logs").to_string_lossy().into_owned(),
        format: LogFormat::Json,
        ..LoggingConfig::default()
    };
    let logs = LogContext::from_config(&config).unwrap();
    let router = build_router(logs, &CorsConfig::default(), Router::new());

    let (status, body) = send(router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({
            "status": "healthy",
            "service": "physical-ai-textbook-api",
            "version": "1.0.0"
        })
    );
    std::fs::remove_file(blocker).unwrap();
}

#[tokio::test]
async fn test_logging_does_not_alter_response() {
    let (logged, _) = make_router();
    let (_, with_logs) = send(logged, "/api/chapters").await;

    let plain = routes();
    let (_, without_logs) = send(plain, "/api/chapters").await;

    assert_eq!(with_logs, without_logs);
}
