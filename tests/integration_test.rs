//! Integration tests for teamchat
//!
//! These tests run against temporary SQLite files and a mock chat-completions
//! endpoint, so no API key is required.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use teamchat::core::llm::ChatMessage;
use teamchat::tools::datetime::CurrentDatetimeTool;
use teamchat::tools::stock::{HistoricalPricesTool, StockPriceTool};
use teamchat::tools::Tool;
use teamchat::{
    build_default_team, exchange, history, Agent, AgentError, ChatError, Role, SessionStore,
    Settings, Stage, StorageError, TranscriptLog,
};
use tempfile::tempdir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Scripted(&'static str);

#[async_trait]
impl Agent for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn respond(
        &self,
        _message: &str,
        _history: &[ChatMessage],
    ) -> Result<String, AgentError> {
        Ok(self.0.to_string())
    }
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    }))
}

#[tokio::test]
async fn test_log_survives_reopen() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("chat.db");

    {
        let log = TranscriptLog::initialize(&db, "demo").unwrap();
        exchange(&log, &Scripted("hi there"), "hello").await.unwrap();
    }

    let reopened = TranscriptLog::initialize(&db, "demo").unwrap();
    let turns = history(&reopened).await.unwrap();

    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].content, "hello");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, "hi there");
    assert!(turns[0].id < turns[1].id);
}

#[tokio::test]
async fn test_two_exchanges_interleave_in_order() {
    let dir = tempdir().unwrap();
    let log = TranscriptLog::initialize(dir.path().join("chat.db"), "demo").unwrap();

    exchange(&log, &Scripted("a1"), "q1").await.unwrap();
    exchange(&log, &Scripted("a2"), "q2").await.unwrap();

    let contents: Vec<_> = history(&log).await.unwrap().into_iter().map(|t| t.content).collect();
    assert_eq!(contents, vec!["q1", "a1", "q2", "a2"]);
}

#[test]
fn test_invalid_table_name_is_rejected() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("chat.db");

    let err = TranscriptLog::initialize(&db, "logs; DROP TABLE x").unwrap_err();

    assert!(matches!(err, StorageError::InvalidIdentifier { .. }));
    assert!(!db.exists());
}

#[tokio::test]
async fn test_history_error_names_stage() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("chat.db");
    let log = TranscriptLog::initialize(&db, "demo").unwrap();

    // Drop the table out from under the handle
    rusqlite::Connection::open(&db)
        .unwrap()
        .execute_batch("DROP TABLE demo")
        .unwrap();

    let err = history(&log).await.unwrap_err();
    assert!(matches!(
        err,
        ChatError::Storage {
            stage: Stage::Read,
            ..
        }
    ));
    assert!(err.to_string().starts_with("History query failed"));
}

#[tokio::test]
async fn test_sessions_are_isolated_and_listed() {
    let dir = tempdir().unwrap();
    let store = SessionStore::open(dir.path().join("sessions.db")).unwrap();

    exchange(&store.session("first"), &Scripted("r1"), "m1").await.unwrap();
    exchange(&store.session("second"), &Scripted("r2"), "m2").await.unwrap();

    let first = store.read_turns("first").unwrap();
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|t| t.content.ends_with('1')));

    let ids: Vec<_> = store
        .list_sessions()
        .unwrap()
        .into_iter()
        .map(|s| s.session_id)
        .collect();
    assert_eq!(ids, vec!["second", "first"]);
}

#[tokio::test]
async fn test_default_team_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("You are a router"))
        .respond_with(completion(
            r#"{"agent_name": "general_query_agent", "reasoning": "geography"}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(completion(
            r#"{"thought": "known fact", "is_final": true, "final_answer": "Paris."}"#,
        ))
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.llm.endpoint = format!("{}/v1/chat/completions", server.uri());
    let team = build_default_team(&settings, "sk-test".to_string());

    let dir = tempdir().unwrap();
    let log = TranscriptLog::initialize(dir.path().join("chat.db"), "demo").unwrap();

    let reply = exchange(&log, &team, "What is the capital of France?").await.unwrap();

    assert_eq!(reply, "Paris.");
    assert_eq!(history(&log).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_default_team_remembers_the_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("You are a router"))
        .respond_with(completion(
            r#"{"agent_name": "general_query_agent", "reasoning": "personal"}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("what is my name"))
        .and(body_string_contains("ZEBRA42"))
        .respond_with(completion(
            r#"{"thought": "recall", "is_final": true, "final_answer": "Your name is ZEBRA42."}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(completion(
            r#"{"thought": "greeting", "is_final": true, "final_answer": "Nice to meet you."}"#,
        ))
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.llm.endpoint = format!("{}/v1/chat/completions", server.uri());
    let team = build_default_team(&settings, "sk-test".to_string());
    let store = SessionStore::open_in_memory().unwrap();
    let session = store.session("s");

    let first = exchange(&session, &team, "my name is ZEBRA42").await.unwrap();
    let second = exchange(&session, &team, "what is my name?").await.unwrap();

    assert_eq!(first, "Nice to meet you.");
    assert_eq!(second, "Your name is ZEBRA42.");

    // Another session starts without that context
    let other = exchange(&store.session("t"), &team, "what is my name?").await.unwrap();
    assert_eq!(other, "Nice to meet you.");
}

#[tokio::test]
async fn test_stock_tool_against_mock_quote_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/MSFT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {
                "result": [{"meta": {
                    "symbol": "MSFT",
                    "currency": "USD",
                    "regularMarketPrice": 415.5
                }}],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let tool = StockPriceTool::new(server.uri(), 5);
    let result = tool.execute(json!({"ticker": "msft"})).await.unwrap();

    assert!(result.success);
    assert!(result.output.contains("MSFT"));
    assert!(result.output.contains("415.5"));
}

#[tokio::test]
async fn test_tool_metadata() {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(CurrentDatetimeTool::new()),
        Arc::new(StockPriceTool::new("http://127.0.0.1:9", 1)),
        Arc::new(HistoricalPricesTool::new("http://127.0.0.1:9", 1)),
    ];

    let names: Vec<_> = tools.iter().map(|t| t.metadata().name).collect();
    assert_eq!(names, vec!["current_datetime", "stock_price", "historical_prices"]);

    let stock = tools[1].metadata();
    assert_eq!(stock.parameters[0].name, "ticker");
    assert!(stock.parameters[0].required);

    let history = tools[2].metadata();
    let optional: Vec<_> = history
        .parameters
        .iter()
        .filter(|p| !p.required)
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(optional, vec!["period", "interval"]);
}
