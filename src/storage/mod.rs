//! SQLite transcript storage
//!
//! Two stores share one row shape, `(id, [session_id,] role, content, created_at)`:
//! - [`log::TranscriptLog`]: one table per log, addressed by database path and
//!   table name
//! - [`sessions::SessionStore`]: one shared `chat_logs` table holding many
//!   sessions keyed by a caller-chosen id
//!
//! Turns are append-only. Reads order by `created_at` and break ties on the
//! autoincrement `id`, so insertion order is preserved even when two turns
//! land in the same millisecond.

pub mod log;
pub mod sessions;

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use log::TranscriptLog;
pub use sessions::{SessionStore, SessionSummary, SessionTranscript};

/// Server-side insert timestamp with millisecond precision
pub(crate) const CREATED_AT_DEFAULT: &str = "(strftime('%Y-%m-%d %H:%M:%f', 'now'))";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static TABLE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid {kind} '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection lock poisoned")]
    LockPoisoned,

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Run a store call on tokio's blocking pool. SQLite calls can wait on the
/// connection lock and the busy timeout, which must not stall an async worker.
pub async fn run_blocking<T, F>(call: F) -> Result<T, StorageError>
where
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call).await?
}

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: UnknownRole| FromSqlError::Other(Box::new(e)))
    }
}

/// One persisted message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub created_at: NaiveDateTime,
}

impl Turn {
    /// Maps rows selected as `id, role, content, created_at`
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            role: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

/// An append-only, ordered sequence of turns.
///
/// Implemented by both store handles so the turn sequencer in
/// [`crate::chat`] works against either.
pub trait Transcript: Send + Sync {
    fn append_turn(&self, role: Role, content: &str) -> Result<Turn, StorageError>;

    /// Snapshot of every turn, oldest first
    fn turns(&self) -> Result<Vec<Turn>, StorageError>;
}

pub(crate) fn validate_table_name(name: &str) -> Result<(), StorageError> {
    if TABLE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier {
            kind: "table name",
            value: name.to_string(),
        })
    }
}

pub(crate) fn open_connection(path: &Path) -> Result<Connection, StorageError> {
    if path.as_os_str().is_empty() {
        return Err(StorageError::InvalidIdentifier {
            kind: "database location",
            value: String::new(),
        });
    }

    let conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}
