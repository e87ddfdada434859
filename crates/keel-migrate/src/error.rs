//! Error types for keel-migrate

use keel_db::{DbError, ForeignKeyViolation};
use thiserror::Error;

/// Boxed error returned by migration transforms.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Migration errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Usage error: a migration with this identifier was already registered (K001)
    #[error("[K001] Duplicate migration identifier: {identifier}")]
    DuplicateMigration { identifier: String },

    /// Usage error: the requested target is not registered (K002)
    #[error("[K002] Undefined migration: {identifier}")]
    UnknownMigration { identifier: String },

    /// Usage error: the ledger already holds a migration registered after the target (K003)
    #[error("[K003] Database is already migrated beyond migration {target} (found {applied})")]
    DatabaseAhead { target: String, applied: String },

    /// The migration's transform returned an error (K004)
    #[error("[K004] Migration {identifier} failed: {source}")]
    Transform {
        identifier: String,
        #[source]
        source: BoxError,
    },

    /// Deferred foreign key check found violations (K005)
    #[error(
        "[K005] Migration {identifier} violates {count} foreign key constraint(s): {first}",
        count = .violations.len(),
        first = .violations.first().map(ToString::to_string).unwrap_or_default()
    )]
    ForeignKeyViolation {
        identifier: String,
        violations: Vec<ForeignKeyViolation>,
    },

    /// Failure from the database layer (K006)
    #[error(transparent)]
    Database(#[from] DbError),

    /// SQLite driver error with preserved source chain (K007)
    #[error("[K007] SQLite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;

impl From<rusqlite::Error> for MigrateError {
    fn from(err: rusqlite::Error) -> Self {
        MigrateError::Sqlite(err)
    }
}

impl MigrateError {
    /// Whether this error is a programming mistake rather than a runtime
    /// failure: duplicate registration, unknown target, or a database that
    /// is already past the target.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            MigrateError::DuplicateMigration { .. }
                | MigrateError::UnknownMigration { .. }
                | MigrateError::DatabaseAhead { .. }
        )
    }

    /// Identifier of the migration that failed, when known
    pub fn migration_identifier(&self) -> Option<&str> {
        match self {
            MigrateError::DuplicateMigration { identifier }
            | MigrateError::UnknownMigration { identifier }
            | MigrateError::Transform { identifier, .. }
            | MigrateError::ForeignKeyViolation { identifier, .. } => Some(identifier),
            MigrateError::DatabaseAhead { target, .. } => Some(target),
            MigrateError::Database(_) | MigrateError::Sqlite(_) => None,
        }
    }
}
