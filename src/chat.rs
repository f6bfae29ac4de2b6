//! Turn sequencing
//!
//! Every exchange runs in a fixed order: persist the user turn, ask the agent,
//! persist the assistant turn. A failed step stops the sequence, so the agent
//! never runs for an unrecorded message and no assistant turn exists without
//! its user turn. A user turn may exist without an answer.
//!
//! The agent sees the last [`HISTORY_TURNS`] turns recorded before the
//! message. Store calls run on the blocking pool.

use crate::agent::{Agent, AgentError};
use crate::core::llm::ChatMessage;
use crate::storage::{run_blocking, Role, StorageError, Transcript, Turn};
use std::fmt;
use thiserror::Error;

/// Earlier turns handed to the agent with each message (ten exchanges)
pub const HISTORY_TURNS: usize = 20;

/// Step of an exchange that touched storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    UserWrite,
    AssistantWrite,
    Read,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::UserWrite => "DB write (user)",
            Stage::AssistantWrite => "DB write (assistant)",
            Stage::Read => "History query",
        })
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("DB not initialized. Call /api/init first.")]
    NotInitialized,

    #[error("{stage} failed: {source}")]
    Storage {
        stage: Stage,
        #[source]
        source: StorageError,
    },

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

impl ChatError {
    pub(crate) fn storage(stage: Stage) -> impl FnOnce(StorageError) -> Self {
        move |source| ChatError::Storage { stage, source }
    }
}

async fn append<T>(transcript: &T, role: Role, content: &str) -> Result<Turn, StorageError>
where
    T: Transcript + Clone + 'static,
{
    let transcript = transcript.clone();
    let content = content.to_string();
    run_blocking(move || transcript.append_turn(role, &content)).await
}

/// The last [`HISTORY_TURNS`] turns written before turn `before`. A failed
/// read only costs the agent its context.
async fn context<T>(transcript: &T, before: i64) -> Vec<ChatMessage>
where
    T: Transcript + Clone + 'static,
{
    let reader = transcript.clone();
    let turns = match run_blocking(move || reader.turns()).await {
        Ok(turns) => turns,
        Err(e) => {
            tracing::warn!("[chat] Answering turn #{} without history: {}", before, e);
            return Vec::new();
        }
    };

    let earlier: Vec<&Turn> = turns.iter().filter(|t| t.id < before).collect();
    let skip = earlier.len().saturating_sub(HISTORY_TURNS);
    earlier[skip..].iter().map(|t| ChatMessage::from(*t)).collect()
}

/// Record `message`, get the agent's reply and record that too.
///
/// If the reply cannot be stored it is not returned: the caller gets the
/// storage error and the reply only survives in the error log.
pub async fn exchange<T>(
    transcript: &T,
    agent: &dyn Agent,
    message: &str,
) -> Result<String, ChatError>
where
    T: Transcript + Clone + 'static,
{
    let user_turn = append(transcript, Role::User, message)
        .await
        .map_err(ChatError::storage(Stage::UserWrite))?;
    tracing::debug!("[chat] Recorded user turn #{}", user_turn.id);

    let history = context(transcript, user_turn.id).await;

    let reply = agent.respond(message, &history).await.map_err(|e| {
        tracing::error!(
            "[chat] {} failed on turn #{}: {}",
            agent.name(),
            user_turn.id,
            e
        );
        e
    })?;

    if let Err(e) = append(transcript, Role::Assistant, &reply).await {
        tracing::error!(
            "[chat] Dropping {}-byte reply to turn #{}: {}",
            reply.len(),
            user_turn.id,
            e
        );
        return Err(ChatError::storage(Stage::AssistantWrite)(e));
    }

    Ok(reply)
}

pub async fn history<T>(transcript: &T) -> Result<Vec<Turn>, ChatError>
where
    T: Transcript + Clone + 'static,
{
    let transcript = transcript.clone();
    run_blocking(move || transcript.turns())
        .await
        .map_err(ChatError::storage(Stage::Read))
}
