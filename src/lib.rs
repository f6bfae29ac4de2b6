//! Teamchat - multi-agent chat assistant with a durable SQLite turn log
//!
//! A two-member agent team answers user messages; every exchange is recorded
//! as an ordered sequence of turns. The same orchestration serves the HTTP
//! API, the interactive console and the one-shot CLI.

pub mod agent;
pub mod chat;
pub mod cli;
mod config;
pub mod core;
pub mod server;
pub mod storage;
pub mod tools;
pub mod utils;

pub use agent::{build_default_team, respond_or_apologize, Agent, AgentError, AgentTeam, APOLOGY};
pub use chat::{exchange, history, ChatError, Stage};
pub use crate::config::{
    AgentConfig, AuthStyle, LLMConfig, LoggingConfig, ServerConfig, Settings, StorageConfig,
    ToolsConfig,
};
pub use storage::{Role, SessionStore, StorageError, Transcript, TranscriptLog, Turn};
