//! HTTP API tests against the real session manager and default client.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use tempfile::TempDir;
use whatsapp_sessions::{
    client::DefaultClientFactory,
    config::SessionsConfig,
    http::{create_router, AppState},
    session::ReconnectConfig,
    SessionManager,
};

const INDEX_HTML: &str = "<!doctype html><title>sessions</title>";

fn create_test_server(root: &TempDir) -> TestServer {
    let sessions = SessionsConfig {
        auth_dir: root.path().join("auth"),
        log_dir: root.path().join("logs"),
        print_qr_in_terminal: false,
        ..SessionsConfig::default()
    };
    let manager = SessionManager::new(
        sessions,
        ReconnectConfig::immediate(1),
        Arc::new(DefaultClientFactory),
    );
    let state = AppState::new(manager, root.path().join("index.html"));
    TestServer::new(create_router(state)).expect("Failed to create test server")
}

async fn wait_for_qr(server: &TestServer) -> serde_json::Value {
    for _ in 0..200 {
        let response = server.get("/qr").await;
        if response.status_code() == StatusCode::OK {
            return response.json();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no QR code was published");
}

// ============ Session Endpoint Tests ============

#[tokio::test]
async fn add_session_starts_once() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);

    let response = server.get("/add-session/alpha").await;
    response.assert_status_ok();
    response.assert_text("Session alpha started.");

    let response = server.get("/add-session/alpha").await;
    response.assert_status_ok();
    response.assert_text("Session alpha is already running.");

    assert!(root.path().join("auth").join("alpha").is_dir());
}

#[tokio::test]
async fn sessions_are_listed_in_creation_order() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);

    server.get("/add-session/session1").await.assert_status_ok();
    server.get("/add-session/alpha").await.assert_status_ok();

    let ids: Vec<String> = server.get("/sessions").await.json();
    assert_eq!(ids, vec!["session1".to_string(), "alpha".to_string()]);
}

#[tokio::test]
async fn session_status_reports_state() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);

    server.get("/add-session/alpha").await.assert_status_ok();

    let response = server.get("/sessions/alpha").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["id"], "alpha");
    assert!(body["state"].is_string());
    assert_eq!(body["reconnectAttempts"], 0);

    let response = server.get("/sessions/missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_text("Session missing not found.");
}

// ============ Send Endpoint Tests ============

#[tokio::test]
async fn send_to_unknown_session_is_not_found() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);

    let response = server
        .get("/send/ghost")
        .add_query_param("to", "15551234567")
        .add_query_param("message", "hi")
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_text("Session ghost not found.");
}

#[tokio::test]
async fn send_before_login_fails() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);
    server.get("/add-session/alpha").await.assert_status_ok();

    let response = server
        .get("/send/alpha")
        .add_query_param("to", "15551234567")
        .add_query_param("message", "hi")
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_text("Failed to send message via session alpha.");
}

#[tokio::test]
async fn send_without_recipient_fails() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);
    server.get("/add-session/alpha").await.assert_status_ok();

    let response = server.get("/send/alpha").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_text("Failed to send message via session alpha.");
}

// ============ QR Endpoint Tests ============

#[tokio::test]
async fn qr_is_unavailable_without_sessions() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);

    let response = server.get("/qr").await;

    response.assert_status(StatusCode::NOT_FOUND);
    response.assert_text("No QR code available");
}

#[tokio::test]
async fn qr_is_served_while_awaiting_login() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);
    server.get("/add-session/alpha").await.assert_status_ok();

    let body = wait_for_qr(&server).await;
    let url = body["qrDataURL"].as_str().unwrap();
    assert!(url.starts_with("data:image/png;base64,"));
}

// ============ Landing Page Tests ============

#[tokio::test]
async fn index_serves_landing_page() {
    let root = TempDir::new().unwrap();
    std::fs::write(root.path().join("index.html"), INDEX_HTML).unwrap();
    let server = create_test_server(&root);

    let response = server.get("/").await;

    response.assert_status_ok();
    response.assert_text(INDEX_HTML);
}

#[tokio::test]
async fn index_is_not_found_when_missing() {
    let root = TempDir::new().unwrap();
    let server = create_test_server(&root);

    server.get("/").await.assert_status(StatusCode::NOT_FOUND);
}
