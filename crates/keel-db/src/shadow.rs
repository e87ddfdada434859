//! Disposable on-disk databases.

use crate::config::ConnectionConfig;
use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SHADOW_FILE_NAME: &str = "shadow.sqlite";

/// A fresh, private database living in a temporary directory.
///
/// The database file is stored on disk rather than in memory so that large
/// data migrations are not bounded by RAM and the connection goes through the
/// same preparation as a real file database. The connection is closed and the
/// directory removed when the value is dropped.
pub struct ShadowDatabase {
    // Declared before `dir` so the connection closes before the files go.
    conn: Connection,
    path: PathBuf,
    dir: TempDir,
}

impl ShadowDatabase {
    /// Create an empty shadow database prepared with `config`, in the
    /// system temporary directory.
    pub fn create(config: &ConnectionConfig) -> DbResult<Self> {
        Self::create_in(config, &std::env::temp_dir())
    }

    /// Create an empty shadow database in a fresh directory under `parent`.
    pub fn create_in(config: &ConnectionConfig, parent: &Path) -> DbResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("keel-shadow-")
            .tempdir_in(parent)
            .map_err(DbError::ShadowError)?;
        let path = dir.path().join(SHADOW_FILE_NAME);
        let conn = config.open(&path)?;
        log::debug!("Created shadow database at {}", path.display());
        Ok(Self { conn, path, dir })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Location of the database file (valid until the value is dropped)
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Temporary directory holding the database and its journal files
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

#[cfg(test)]
#[path = "shadow_test.rs"]
mod tests;
