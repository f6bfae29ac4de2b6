//! Multi-session chat log
//!
//! Every conversation lives in the shared `chat_logs` table, tagged with its
//! session id. A session exists as soon as its first turn is written, and its
//! creation time is that first turn's timestamp.

use super::{open_connection, Role, StorageError, Transcript, Turn, CREATED_AT_DEFAULT};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const TABLE: &str = "chat_logs";

/// A session and the time of its first turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SessionStore {
    /// Open (or create) the database at `path` and ensure the shared table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let store = Self::from_connection(open_connection(path)?)?;
        tracing::info!("[SessionStore] Opened session log at {:?}", path);
        Ok(store)
    }

    /// Ephemeral store, mostly for tests
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT {CREATED_AT_DEFAULT}
            );
            CREATE INDEX IF NOT EXISTS idx_{TABLE}_session
                ON {TABLE} (session_id, created_at);"
        ))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn append_turn(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Turn, StorageError> {
        if session_id.is_empty() {
            return Err(StorageError::InvalidIdentifier {
                kind: "session id",
                value: String::new(),
            });
        }

        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO {TABLE} (session_id, role, content) VALUES (?1, ?2, ?3)"),
            params![session_id, role, content],
        )?;

        let turn = conn.query_row(
            &format!("SELECT id, role, content, created_at FROM {TABLE} WHERE id = ?1"),
            params![conn.last_insert_rowid()],
            Turn::from_row,
        )?;

        tracing::debug!(
            "[SessionStore] Appended {} turn #{} to session '{}'",
            role,
            turn.id,
            session_id
        );
        Ok(turn)
    }

    /// Turns of one session, oldest first. Unknown sessions are empty.
    pub fn read_turns(&self, session_id: &str) -> Result<Vec<Turn>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, role, content, created_at FROM {TABLE}
             WHERE session_id = ?1
             ORDER BY created_at ASC, id ASC"
        ))?;

        let turns = stmt
            .query_map(params![session_id], Turn::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "[SessionStore] Loaded {} turns for session '{}'",
            turns.len(),
            session_id
        );
        Ok(turns)
    }

    /// Every session with its creation time, newest session first
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT session_id, MIN(created_at) AS first_at, MIN(id) AS first_id
             FROM {TABLE}
             GROUP BY session_id
             ORDER BY first_at DESC, first_id DESC"
        ))?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    session_id: row.get(0)?,
                    created_at: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("[SessionStore] Listed {} sessions", sessions.len());
        Ok(sessions)
    }

    /// Handle scoped to one session
    pub fn session(&self, session_id: impl Into<String>) -> SessionTranscript {
        SessionTranscript {
            store: self.clone(),
            session_id: session_id.into(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

/// One session of a [`SessionStore`], usable wherever a [`Transcript`] is
#[derive(Debug, Clone)]
pub struct SessionTranscript {
    store: SessionStore,
    session_id: String,
}

impl SessionTranscript {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Transcript for SessionTranscript {
    fn append_turn(&self, role: Role, content: &str) -> Result<Turn, StorageError> {
        self.store.append_turn(&self.session_id, role, content)
    }

    fn turns(&self) -> Result<Vec<Turn>, StorageError> {
        self.store.read_turns(&self.session_id)
    }
}
