//! Single-table transcript log
//!
//! [`TranscriptLog::initialize`] creates the table if needed and hands back
//! the handle every later call goes through. There is no process-wide
//! "current log": whoever holds the handle decides where turns go.

use super::{
    open_connection, validate_table_name, Role, StorageError, Transcript, Turn, CREATED_AT_DEFAULT,
};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle to one initialized log. Cloning shares the connection; all writes
/// through clones are serialized by the same lock.
#[derive(Debug, Clone)]
pub struct TranscriptLog {
    conn: Arc<Mutex<Connection>>,
    location: PathBuf,
    name: String,
}

impl TranscriptLog {
    /// Open `location` and make sure table `name` exists.
    ///
    /// Idempotent: initializing an existing log keeps its turns.
    pub fn initialize(location: impl AsRef<Path>, name: &str) -> Result<Self, StorageError> {
        let location = location.as_ref();
        validate_table_name(name)?;
        let conn = open_connection(location)?;

        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{name}\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                role TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
                content TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT {CREATED_AT_DEFAULT}
            );"
        ))?;

        tracing::info!(
            "[TranscriptLog] Initialized table '{}' in {:?}",
            name,
            location
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: location.to_path_buf(),
            name: name.to_string(),
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn append_turn(&self, role: Role, content: &str) -> Result<Turn, StorageError> {
        let conn = self.lock()?;
        conn.execute(
            &format!("INSERT INTO \"{}\" (role, content) VALUES (?1, ?2)", self.name),
            params![role, content],
        )?;

        let id = conn.last_insert_rowid();
        let turn = conn.query_row(
            &format!(
                "SELECT id, role, content, created_at FROM \"{}\" WHERE id = ?1",
                self.name
            ),
            params![id],
            Turn::from_row,
        )?;

        tracing::debug!(
            "[TranscriptLog] Appended {} turn #{} to '{}'",
            role,
            turn.id,
            self.name
        );
        Ok(turn)
    }

    pub fn read_all_turns(&self) -> Result<Vec<Turn>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, role, content, created_at FROM \"{}\" ORDER BY created_at ASC, id ASC",
            self.name
        ))?;

        let turns = stmt
            .query_map([], Turn::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "[TranscriptLog] Read {} turns from '{}'",
            turns.len(),
            self.name
        );
        Ok(turns)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl Transcript for TranscriptLog {
    fn append_turn(&self, role: Role, content: &str) -> Result<Turn, StorageError> {
        TranscriptLog::append_turn(self, role, content)
    }

    fn turns(&self) -> Result<Vec<Turn>, StorageError> {
        self.read_all_turns()
    }
}
