//! `/api` routes.
//!
//! - `POST /init`, `POST /chat`, `GET /history` drive the log chosen at init
//! - `GET /sessions`, `GET /sessions/{id}/turns`, `POST /sessions/{id}/chat`
//!   drive the multi-session log

use super::error::ApiError;
use super::state::AppState;
use crate::chat::{self, ChatError, Stage};
use crate::storage::{run_blocking, SessionStore, SessionSummary, TranscriptLog, Turn};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct InitRequest {
    /// SQLite database file
    #[serde(alias = "db_file")]
    pub location: String,
    /// Table to log turns into
    #[serde(alias = "table_name")]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub status: &'static str,
    pub location: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub role: &'static str,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl From<Turn> for TurnResponse {
    fn from(turn: Turn) -> Self {
        Self {
            role: turn.role.as_str(),
            content: turn.content,
            created_at: turn.created_at,
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/init", post(init))
        .route("/chat", post(chat))
        .route("/history", get(history))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}/turns", get(session_turns))
        .route("/sessions/{id}/chat", post(session_chat))
}

async fn init(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InitRequest>,
) -> Result<Json<InitResponse>, ApiError> {
    let (location, name) = (req.location.clone(), req.name.clone());
    let log = run_blocking(move || TranscriptLog::initialize(&location, &name))
        .await
        .map_err(ApiError::Initialization)?;
    state.activate(log).await;

    Ok(Json(InitResponse {
        status: "initialized",
        location: req.location,
        name: req.name,
    }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let log = state.active_log().await?;
    let reply = chat::exchange(&log, state.agent.as_ref(), &req.message).await?;
    Ok(Json(ChatReply { reply }))
}

async fn history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<TurnResponse>>, ApiError> {
    let log = state.active_log().await?;
    let turns = chat::history(&log).await?;
    Ok(Json(turns.into_iter().map(TurnResponse::from).collect()))
}

fn sessions(state: &AppState) -> Result<&SessionStore, ApiError> {
    state.sessions.as_ref().ok_or(ApiError::SessionsDisabled)
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let store = sessions(&state)?.clone();
    let summaries = run_blocking(move || store.list_sessions())
        .await
        .map_err(ChatError::storage(Stage::Read))?;
    Ok(Json(summaries))
}

async fn session_turns(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TurnResponse>>, ApiError> {
    let transcript = sessions(&state)?.session(id);
    let turns = chat::history(&transcript).await?;
    Ok(Json(turns.into_iter().map(TurnResponse::from).collect()))
}

async fn session_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    let transcript = sessions(&state)?.session(id);
    let reply = chat::exchange(&transcript, state.agent.as_ref(), &req.message).await?;
    Ok(Json(ChatReply { reply }))
}
