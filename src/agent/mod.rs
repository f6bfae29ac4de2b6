//! Agents that turn a user message into a reply
//!
//! [`Agent`] is the seam between the chat surfaces and the LLM: the HTTP
//! routes, the console and the turn sequencer only ever see this trait.

mod factory;
pub mod specialized;
pub mod team;

use crate::core::llm::ChatMessage;
use async_trait::async_trait;
use thiserror::Error;

pub use factory::{build_default_team, GENERAL_QUERY_AGENT, STOCK_DATETIME_AGENT};
pub use specialized::{SpecializedAgent, SpecializedAgentConfig};
pub use team::AgentTeam;

/// Shown by the console when the agent fails
pub const APOLOGY: &str = "Sorry, I encountered an error while processing your request.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM request failed: {0:#}")]
    Llm(anyhow::Error),

    #[error("{agent} did not reach a final answer within {iterations} iterations")]
    Incomplete { agent: String, iterations: usize },

    #[error("no agent available to handle the request (wanted '{0}')")]
    NoRoute(String),
}

#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// One-line summary used when a router chooses between agents
    fn description(&self) -> &str {
        ""
    }

    /// Reply to `message`. `history` holds the earlier turns of the same
    /// conversation, oldest first, without `message` itself.
    async fn respond(&self, message: &str, history: &[ChatMessage]) -> Result<String, AgentError>;
}

/// Ask `agent` for a reply, trading any failure for [`APOLOGY`].
pub async fn respond_or_apologize(
    agent: &dyn Agent,
    message: &str,
    history: &[ChatMessage],
) -> String {
    match agent.respond(message, history).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("[{}] Replying with apology: {}", agent.name(), e);
            APOLOGY.to_string()
        }
    }
}

/// Pull the first `{ ... }` object out of a model reply that wrapped its JSON
/// in prose or code fences.
pub(crate) fn extract_json<T: serde::de::DeserializeOwned>(response: &str) -> Option<T> {
    if let Ok(value) = serde_json::from_str(response) {
        return Some(value);
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}
