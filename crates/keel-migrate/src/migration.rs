//! Migration definitions.

use crate::error::BoxError;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// The body of a migration.
///
/// Receives the connection (inside the migration's transaction) and the
/// merged identifiers already recorded in the ledger, so a merged migration
/// can skip the steps those older migrations already performed.
pub type Transform = Arc<dyn Fn(&Connection, &BTreeSet<String>) -> Result<(), BoxError> + Send + Sync>;

/// How foreign keys are checked while a migration runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForeignKeyChecks {
    /// Enforcement is off during the migration; violations are looked for
    /// once, just before commit, and fail the migration.
    #[default]
    Deferred,
    /// Enforcement stays on: every statement is checked as it runs.
    Immediate,
    /// Enforcement is off during the migration and never checked.
    Disabled,
}

impl fmt::Display for ForeignKeyChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ForeignKeyChecks::Deferred => "deferred",
            ForeignKeyChecks::Immediate => "immediate",
            ForeignKeyChecks::Disabled => "disabled",
        })
    }
}

impl std::str::FromStr for ForeignKeyChecks {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deferred" => Ok(ForeignKeyChecks::Deferred),
            "immediate" => Ok(ForeignKeyChecks::Immediate),
            "disabled" => Ok(ForeignKeyChecks::Disabled),
            other => Err(format!(
                "unknown foreign key checks '{other}' (expected deferred, immediate or disabled)"
            )),
        }
    }
}

/// A single registered schema or data change.
#[derive(Clone)]
pub struct Migration {
    identifier: String,
    merged_identifiers: BTreeSet<String>,
    foreign_key_checks: Option<ForeignKeyChecks>,
    transform: Transform,
}

impl Migration {
    /// Create a migration from a transform closure.
    ///
    /// Foreign key checks are left to the migrator's default until set with
    /// [`foreign_key_checks`](Self::foreign_key_checks).
    pub fn new<F>(identifier: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&Connection, &BTreeSet<String>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            identifier: identifier.into(),
            merged_identifiers: BTreeSet::new(),
            foreign_key_checks: None,
            transform: Arc::new(transform),
        }
    }

    /// Create a migration that runs a batch of SQL statements.
    pub fn sql(identifier: impl Into<String>, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self::new(identifier, move |conn, _| {
            conn.execute_batch(&sql)?;
            Ok(())
        })
    }

    /// Declare the older migrations this one replaces.
    pub fn merging<I, S>(mut self, identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merged_identifiers
            .extend(identifiers.into_iter().map(Into::into));
        self
    }

    /// Pin the foreign key policy of this migration.
    pub fn foreign_key_checks(mut self, checks: ForeignKeyChecks) -> Self {
        self.foreign_key_checks = Some(checks);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Identifiers this migration replaces (never includes its own)
    pub fn merged_identifiers(&self) -> &BTreeSet<String> {
        &self.merged_identifiers
    }

    /// Effective foreign key policy
    pub fn checks(&self) -> ForeignKeyChecks {
        self.foreign_key_checks.unwrap_or_default()
    }

    /// Drop a self-reference and fill in the default policy.
    pub(crate) fn normalized(mut self, default_checks: ForeignKeyChecks) -> Self {
        self.merged_identifiers.remove(&self.identifier);
        if self.foreign_key_checks.is_none() {
            self.foreign_key_checks = Some(default_checks);
        }
        self
    }

    /// Merged identifiers present in `ledger`
    pub(crate) fn applied_merged(&self, ledger: &BTreeSet<String>) -> BTreeSet<String> {
        self.merged_identifiers
            .intersection(ledger)
            .cloned()
            .collect()
    }

    pub(crate) fn run(
        &self,
        conn: &Connection,
        applied_merged: &BTreeSet<String>,
    ) -> Result<(), BoxError> {
        (self.transform)(conn, applied_merged)
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("identifier", &self.identifier)
            .field("merged_identifiers", &self.merged_identifiers)
            .field("foreign_key_checks", &self.foreign_key_checks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
