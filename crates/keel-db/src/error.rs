//! Error types for keel-db

use thiserror::Error;

/// Database operation errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Database connection failed: {0}")]
    ConnectionError(String),

    /// Schema introspection error (D003)
    #[error("[D003] Failed to read database schema: {0}")]
    SchemaError(String),

    /// Shadow database could not be created (D004)
    #[error("[D004] Shadow database unavailable: {0}")]
    ShadowError(#[source] std::io::Error),

    /// Mutex poisoned (D006)
    #[error("[D006] Database mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Internal error (D007)
    #[error("[D007] Internal database error: {0}")]
    Internal(String),

    /// SQLite driver error with preserved source chain (D008)
    #[error("[D008] SQLite error")]
    Sqlite(#[source] rusqlite::Error),
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Sqlite(err)
    }
}
