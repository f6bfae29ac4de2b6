//! Shared application state injected into every handler.

use crate::agent::Agent;
use crate::chat::ChatError;
use crate::storage::{SessionStore, TranscriptLog};
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct AppState {
    pub agent: Arc<dyn Agent>,
    /// Log chosen by the last successful `POST /api/init`
    active_log: RwLock<Option<TranscriptLog>>,
    /// Backing store for the `/api/sessions` routes, when configured
    pub sessions: Option<SessionStore>,
}

impl AppState {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            agent,
            active_log: RwLock::new(None),
            sessions: None,
        }
    }

    pub fn with_sessions(mut self, store: SessionStore) -> Self {
        self.sessions = Some(store);
        self
    }

    /// Replace the active log. Requests already holding the previous handle
    /// finish against it.
    pub async fn activate(&self, log: TranscriptLog) {
        *self.active_log.write().await = Some(log);
    }

    pub async fn active_log(&self) -> Result<TranscriptLog, ChatError> {
        self.active_log
            .read()
            .await
            .clone()
            .ok_or(ChatError::NotInitialized)
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("agent", &self.agent.name())
            .field("sessions_enabled", &self.sessions.is_some())
            .finish()
    }
}
