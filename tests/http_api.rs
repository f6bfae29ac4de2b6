//! HTTP API tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use teamchat::server::{self, AppState};
use teamchat::core::llm::ChatMessage;
use teamchat::{Agent, AgentError, SessionStore};
use tempfile::tempdir;
use tower::ServiceExt;

struct Echo;

#[async_trait]
impl Agent for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn respond(&self, message: &str, history: &[ChatMessage]) -> Result<String, AgentError> {
        Ok(format!("echo: {} ({} earlier)", message, history.len()))
    }
}

struct Unreachable;

#[async_trait]
impl Agent for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }

    async fn respond(
        &self,
        _message: &str,
        _history: &[ChatMessage],
    ) -> Result<String, AgentError> {
        Err(AgentError::Llm(anyhow::anyhow!("connection refused")))
    }
}

fn app(agent: Arc<dyn Agent>) -> Router {
    server::build(Arc::new(AppState::new(agent)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn init(app: &Router, db: &Path, name: &str) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/init",
        Some(json!({"location": db.to_str().unwrap(), "name": name})),
    )
    .await
}

async fn chat(app: &Router, message: &str) -> (StatusCode, Value) {
    send(app, Method::POST, "/api/chat", Some(json!({"message": message}))).await
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(Arc::new(Echo)), Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_chat_before_init_is_rejected() {
    let app = app(Arc::new(Echo));

    let (status, body) = chat(&app, "hello").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "DB not initialized. Call /api/init first.");

    let (status, _) = send(&app, Method::GET, "/api/history", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_init_chat_history() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("chat.db");
    let app = app(Arc::new(Echo));

    let (status, body) = init(&app, &db, "demo").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "initialized");
    assert_eq!(body["name"], "demo");

    let (status, body) = chat(&app, "hello").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"reply": "echo: hello (0 earlier)"}));

    let (status, body) = send(&app, Method::GET, "/api/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let turns = body.as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[0]["content"], "hello");
    assert_eq!(turns[1]["role"], "assistant");
    assert_eq!(turns[1]["content"], "echo: hello (0 earlier)");
    assert!(turns[0]["created_at"].is_string());
}

#[tokio::test]
async fn test_init_accepts_legacy_field_names() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("chat.db");
    let app = app(Arc::new(Echo));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/init",
        Some(json!({"db_file": db.to_str().unwrap(), "table_name": "legacy"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "legacy");
}

#[tokio::test]
async fn test_init_rejects_bad_table_name() {
    let dir = tempdir().unwrap();
    let app = app(Arc::new(Echo));

    let (status, body) = init(&app, &dir.path().join("chat.db"), "bad-name").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().starts_with("Initialization failed"));

    let (status, _) = chat(&app, "hello").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_agent_failure_keeps_user_turn() {
    let dir = tempdir().unwrap();
    let app = app(Arc::new(Unreachable));
    init(&app, &dir.path().join("chat.db"), "demo").await;

    let (status, body) = chat(&app, "hello").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().starts_with("Agent error:"));

    let (_, body) = send(&app, Method::GET, "/api/history", None).await;
    let turns = body.as_array().unwrap();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0]["role"], "user");
}

#[tokio::test]
async fn test_reinit_keeps_existing_turns() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("chat.db");
    let app = app(Arc::new(Echo));

    init(&app, &db, "demo").await;
    chat(&app, "first").await;
    init(&app, &db, "other").await;
    chat(&app, "second").await;

    let (status, _) = init(&app, &db, "demo").await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/api/history", None).await;
    let contents: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, vec!["first", "echo: first (0 earlier)"]);
}

#[tokio::test]
async fn test_session_routes_disabled_without_store() {
    let app = app(Arc::new(Echo));

    let (status, _) = send(&app, Method::GET, "/api/sessions", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_routes() {
    let state =
        AppState::new(Arc::new(Echo)).with_sessions(SessionStore::open_in_memory().unwrap());
    let app = server::build(Arc::new(state));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions/abc/chat",
        Some(json!({"message": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "echo: hi (0 earlier)");

    let (status, body) = send(&app, Method::GET, "/api/sessions/abc/turns", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/api/sessions/missing/turns", None).await;
    assert_eq!(body, json!([]));

    let (status, body) = send(&app, Method::GET, "/api/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["session_id"], "abc");
}

#[tokio::test]
async fn test_session_chat_carries_earlier_turns() {
    let state =
        AppState::new(Arc::new(Echo)).with_sessions(SessionStore::open_in_memory().unwrap());
    let app = server::build(Arc::new(state));
    let uri = "/api/sessions/s/chat";

    send(&app, Method::POST, uri, Some(json!({"message": "my name is ZEBRA42"}))).await;
    let question = json!({"message": "what is my name?"});
    let (status, body) = send(&app, Method::POST, uri, Some(question)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "echo: what is my name? (2 earlier)");
}
