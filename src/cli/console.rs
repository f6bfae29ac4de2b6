//! Line-oriented chat console.
//!
//! The console keeps its own in-memory transcript for `/history`. With a
//! session attached, every exchange is also recorded in the multi-session log.

use crate::agent::{respond_or_apologize, Agent, APOLOGY};
use crate::chat::{self, HISTORY_TURNS};
use crate::core::llm::ChatMessage;
use crate::storage::{Role, SessionTranscript};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Message(String),
    History,
    Clear,
    Help,
    Exit,
    Unknown(String),
}

/// Interpret one line of input. Blank lines yield `None`.
pub fn parse_input(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let command = match line {
        "/history" => ConsoleCommand::History,
        "/clear" => ConsoleCommand::Clear,
        "/help" => ConsoleCommand::Help,
        "/exit" | "/quit" => ConsoleCommand::Exit,
        other if other.starts_with('/') => ConsoleCommand::Unknown(other.to_string()),
        other => ConsoleCommand::Message(other.to_string()),
    };
    Some(command)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleEntry {
    pub role: Role,
    pub content: String,
}

pub struct ChatConsole {
    agent: Arc<dyn Agent>,
    entries: Vec<ConsoleEntry>,
    session: Option<SessionTranscript>,
}

impl ChatConsole {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            agent,
            entries: Vec::new(),
            session: None,
        }
    }

    pub fn with_session(mut self, session: SessionTranscript) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_id())
    }

    pub fn entries(&self) -> &[ConsoleEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The last [`HISTORY_TURNS`] entries as agent context
    fn recent(&self) -> Vec<ChatMessage> {
        let skip = self.entries.len().saturating_sub(HISTORY_TURNS);
        self.entries[skip..]
            .iter()
            .map(|e| ChatMessage::from_role(e.role, e.content.clone()))
            .collect()
    }

    /// Send `message` to the agent and return what should be shown.
    ///
    /// Never fails: any agent or storage error is logged and replaced by
    /// [`APOLOGY`]. Without a session the agent's context is the in-memory
    /// transcript, so `/clear` also makes it forget.
    pub async fn submit(&mut self, message: &str) -> String {
        let history = self.recent();
        self.entries.push(ConsoleEntry {
            role: Role::User,
            content: message.to_string(),
        });

        let reply = match &self.session {
            Some(session) => match chat::exchange(session, self.agent.as_ref(), message).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!("[console] session {}: {}", session.session_id(), e);
                    APOLOGY.to_string()
                }
            },
            None => respond_or_apologize(self.agent.as_ref(), message, &history).await,
        };

        self.entries.push(ConsoleEntry {
            role: Role::Assistant,
            content: reply.clone(),
        });
        reply
    }
}
