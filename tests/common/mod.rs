//! Common test utilities and helpers

#![allow(dead_code)]

use breakin_core::{
    api::{ApiServer, ApiServerConfig, EventBroadcaster},
    Scorer,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

/// JSON body of a snapshot as the editor client sends it
pub fn snapshot_body(code: &str, elapsed: u64, focus: u64, keystrokes: u64) -> Value {
    json!({
        "code": code,
        "timestamp": "2024-05-01T12:00:00Z",
        "metrics": {
            "keystrokes": keystrokes,
            "startTime": 1714564800000i64,
            "elapsedTime": elapsed,
            "focusTime": focus,
            "tabSwitches": 0,
            "codeChanges": keystrokes
        },
        "userId": "dev-1",
        "sprintId": "sprint-1",
        "taskId": "task-1"
    })
}

/// Create a test server with a seeded scorer
pub fn create_test_server() -> ApiServer {
    ApiServer::with_scorer(ApiServerConfig::default(), Arc::new(Scorer::seeded(1234)))
}

/// Serve a test server on an ephemeral port
pub async fn spawn_test_server() -> (SocketAddr, EventBroadcaster, ApiServer) {
    let server = create_test_server();
    let router = server.router();
    let broadcaster = server.broadcaster().clone();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has an address");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("Test server error: {}", e);
        }
    });

    (addr, broadcaster, server)
}
