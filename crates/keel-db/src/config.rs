//! Connection configuration shared by live and shadow databases.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Callback run on every freshly opened connection, after the pragmas.
pub type PrepareHook = Arc<dyn Fn(&Connection) -> rusqlite::Result<()> + Send + Sync>;

/// SQLite journal mode applied to file-backed connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Keep whatever mode the database file already uses
    #[default]
    Default,
    /// Rollback journal (`DELETE`)
    Delete,
    /// Write-ahead log
    Wal,
}

impl JournalMode {
    fn pragma_value(self) -> Option<&'static str> {
        match self {
            JournalMode::Default => None,
            JournalMode::Delete => Some("DELETE"),
            JournalMode::Wal => Some("WAL"),
        }
    }
}

/// How connections are opened and prepared.
///
/// The same configuration is used for the live database and for any shadow
/// database created during drift detection, so both see identical pragmas
/// and the same [`PrepareHook`].
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Enforce foreign key constraints (`PRAGMA foreign_keys`)
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,

    /// How long a connection waits on a locked database, in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Journal mode for file-backed databases
    #[serde(default)]
    pub journal_mode: JournalMode,

    /// Extra per-connection setup (functions, collations, pragmas)
    #[serde(skip)]
    pub prepare: Option<PrepareHook>,
}

fn default_foreign_keys() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            foreign_keys: default_foreign_keys(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: JournalMode::default(),
            prepare: None,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("foreign_keys", &self.foreign_keys)
            .field("busy_timeout_ms", &self.busy_timeout_ms)
            .field("journal_mode", &self.journal_mode)
            .field("prepare", &self.prepare.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl ConnectionConfig {
    /// Attach a prepare hook, replacing any previous one.
    pub fn with_prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Connection) -> rusqlite::Result<()> + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(hook));
        self
    }

    /// Open (or create) a database file and prepare the connection.
    pub fn open(&self, path: &Path) -> DbResult<Connection> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        if let Some(mode) = self.journal_mode.pragma_value() {
            conn.pragma_update_and_check(None, "journal_mode", mode, |row| {
                row.get::<_, String>(0)
            })?;
        }
        self.prepare_connection(&conn)?;
        Ok(conn)
    }

    /// Open a private in-memory database and prepare the connection.
    pub fn open_in_memory(&self) -> DbResult<Connection> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        self.prepare_connection(&conn)?;
        Ok(conn)
    }

    fn prepare_connection(&self, conn: &Connection) -> DbResult<()> {
        conn.busy_timeout(Duration::from_millis(self.busy_timeout_ms))?;
        conn.pragma_update(None, "foreign_keys", self.foreign_keys)?;
        if let Some(hook) = &self.prepare {
            hook(conn)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
