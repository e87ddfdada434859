//! Serialized access to a single SQLite connection.

use crate::config::ConnectionConfig;
use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A database connection shared behind one lock.
///
/// Every access holds the lock for its whole duration, so a closure passed
/// to [`write`](Self::write) is a barrier: it waits for, and excludes, every
/// other access to the same queue. Cloning the queue shares the connection.
#[derive(Clone)]
pub struct DatabaseQueue {
    conn: Arc<Mutex<Connection>>,
    config: ConnectionConfig,
}

impl DatabaseQueue {
    /// Open (or create) a database file
    pub fn open(path: &Path, config: ConnectionConfig) -> DbResult<Self> {
        let conn = config.open(path)?;
        Ok(Self::from_connection(conn, config))
    }

    /// Open a private in-memory database
    pub fn in_memory(config: ConnectionConfig) -> DbResult<Self> {
        let conn = config.open_in_memory()?;
        Ok(Self::from_connection(conn, config))
    }

    fn from_connection(conn: Connection, config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        }
    }

    /// Configuration the connection was opened with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Run `body` with exclusive access to the connection.
    pub fn write<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        body(&mut conn)
    }

    /// Run a read-only `body`. Reads share the writer's lock.
    pub fn read<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
        body(&conn)
    }

    /// Run `body` on the blocking thread pool and await its result.
    pub async fn write_async<T, E, F>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<DbError> + Send + 'static,
    {
        let queue = self.clone();
        tokio::task::spawn_blocking(move || queue.write(body))
            .await
            .map_err(|e| DbError::Internal(format!("write task failed: {e}")))?
    }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod tests;
