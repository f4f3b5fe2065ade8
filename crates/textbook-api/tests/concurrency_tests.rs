//! Concurrency tests: simultaneous requests against one shared router,
//! both in-process and over a live socket.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::future::join_all;
use serde_json::{json, Value};
use textbook_api::config::{CorsConfig, ServerConfig};
use textbook_api::router::build_router;
use textbook_api::server::{bind, serve};
use textbook_api::telemetry::LogContext;
use tokio::sync::oneshot;
use tower::ServiceExt;

const CONCURRENT_REQUESTS: usize = 50;

fn expected_health() -> Value {
    json!({
        "status": "healthy",
        "service": "physical-ai-textbook-api",
        "version": "1.0.0"
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_each_get_full_body() {
    let (logs, writer) = LogContext::in_memory();
    let router = build_router(logs, &CorsConfig::default(), axum::Router::new());

    let calls = (0..CONCURRENT_REQUESTS).map(|_| {
        let router = router.clone();
        tokio::spawn(async move {
            let response = router
                .oneshot(Request::get("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice::<Value>(&bytes).unwrap())
        })
    });

    for result in join_all(calls).await {
        let (status, json) = result.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, expected_health());
    }

    // Entries from different requests may interleave, but each request id
    // appears exactly twice: once inbound, once outbound.
    let entries = writer.entries();
    assert_eq!(entries.len(), CONCURRENT_REQUESTS * 2);

    let mut per_request: HashMap<String, Vec<String>> = HashMap::new();
    for entry in &entries {
        let id = entry["fields"]["request_id"].as_str().unwrap().to_owned();
        let message = entry["fields"]["message"].as_str().unwrap().to_owned();
        per_request.entry(id).or_default().push(message);
    }

    assert_eq!(per_request.len(), CONCURRENT_REQUESTS);
    for messages in per_request.values() {
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "Request: GET /health");
        assert_eq!(messages[1], "Response: 200");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_live_server_handles_concurrent_clients() {
    let config = ServerConfig {
        host: String::from("127.0.0.1"),
        port: 0,
    };
    let listener = bind(&config).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (logs, _) = LogContext::in_memory();
    let router = build_router(logs, &CorsConfig::default(), textbook_chat::router());

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, router, async {
        let _ = stopped.await;
    }));

    let client = reqwest::Client::new();
    let calls = (0..CONCURRENT_REQUESTS).map(|_| {
        let client = client.clone();
        async move {
            let response = client
                .get(format!("http://{addr}/health"))
                .send()
                .await
                .unwrap();
            (response.status(), response.json::<Value>().await.unwrap())
        }
    });

    for (status, json) in join_all(calls).await {
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(json, expected_health());
    }

    let missing = client
        .get(format!("http://{addr}/api/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    assert_eq!(
        missing.json::<Value>().await.unwrap(),
        json!({"detail": "Not Found"})
    );

    drop(client);
    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}
