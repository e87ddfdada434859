//! The [`Migrator`]: registration, migration, and ledger queries.

use crate::drift::{self, Drift};
use crate::error::{MigrateError, MigrateResult};
use crate::executor;
use crate::ledger;
use crate::migration::{ForeignKeyChecks, Migration};
use crate::planner;
use keel_db::{ConnectionConfig, DatabaseQueue};
use rusqlite::{Connection, TransactionBehavior};
use std::collections::BTreeSet;

/// An ordered list of migrations and the settings used to apply them.
///
/// Registration order is the one and only application order. Register every
/// migration before the first call to [`migrate`](Self::migrate).
///
/// ```no_run
/// use keel_migrate::{Migration, Migrator};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut migrator = Migrator::new();
/// migrator.register(Migration::sql("create_users", "CREATE TABLE users (id INTEGER PRIMARY KEY)"))?;
/// migrator.register(Migration::sql("add_email", "ALTER TABLE users ADD COLUMN email TEXT"))?;
///
/// let mut conn = rusqlite::Connection::open("app.sqlite")?;
/// migrator.migrate(&mut conn)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Migrator {
    migrations: Vec<Migration>,
    erase_database_on_schema_change: bool,
    default_foreign_key_checks: ForeignKeyChecks,
    connection_config: ConnectionConfig,
}

impl Migrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Erase the database and migrate from scratch whenever
    /// [`has_schema_changes`](Self::has_schema_changes) reports drift.
    ///
    /// Meant for development: every migration is replayed on each change.
    pub fn erase_database_on_schema_change(mut self, erase: bool) -> Self {
        self.erase_database_on_schema_change = erase;
        self
    }

    pub fn erases_database_on_schema_change(&self) -> bool {
        self.erase_database_on_schema_change
    }

    /// A copy of this migrator whose subsequently registered migrations
    /// default to [`ForeignKeyChecks::Disabled`] instead of
    /// [`ForeignKeyChecks::Deferred`]. Migrations already registered keep
    /// their policy.
    pub fn disabling_deferred_foreign_key_checks(&self) -> Self {
        let mut migrator = self.clone();
        migrator.default_foreign_key_checks = ForeignKeyChecks::Disabled;
        migrator
    }

    /// Configuration used to open shadow databases during drift detection.
    ///
    /// Should match how the live database is opened.
    pub fn with_connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    pub fn connection_config(&self) -> &ConnectionConfig {
        &self.connection_config
    }

    /// Append a migration.
    ///
    /// A self-reference among its merged identifiers is dropped. Registering
    /// an identifier twice is a usage error.
    pub fn register(&mut self, migration: Migration) -> MigrateResult<()> {
        if self
            .migrations
            .iter()
            .any(|m| m.identifier() == migration.identifier())
        {
            return Err(MigrateError::DuplicateMigration {
                identifier: migration.identifier().to_string(),
            });
        }
        self.migrations
            .push(migration.normalized(self.default_foreign_key_checks));
        Ok(())
    }

    /// Registered migrations, in order
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Apply every registered migration that is not applied yet.
    pub fn migrate(&self, conn: &mut Connection) -> MigrateResult<()> {
        match self.migrations.len().checked_sub(1) {
            Some(last) => self.migrate_through(conn, last),
            None => Ok(()),
        }
    }

    /// Apply registered migrations up to and including `target`.
    ///
    /// `target` must be registered, and the database must not already hold a
    /// migration registered after it; both are usage errors.
    pub fn migrate_to(&self, conn: &mut Connection, target: &str) -> MigrateResult<()> {
        let target_index = planner::position(&self.migrations, target)?;
        self.migrate_through(conn, target_index)
    }

    fn migrate_through(&self, conn: &mut Connection, target_index: usize) -> MigrateResult<()> {
        if self.erase_database_on_schema_change {
            let changed = {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
                self.has_schema_changes(&tx)?
            };
            if changed {
                log::info!("Schema changes detected, erasing database before migrating");
                keel_db::erase(conn)?;
            }
        }

        ledger::ensure_table(conn)?;
        let applied = ledger::applied_identifiers(conn)?;
        planner::ensure_not_ahead(&self.migrations, target_index, &applied)?;

        let steps = planner::plan(&self.migrations, target_index, &applied);
        if steps.is_empty() {
            log::debug!(
                "Database is up to date with {}",
                self.migrations[target_index].identifier()
            );
            return Ok(());
        }
        executor::execute(conn, &steps)
    }

    /// Migrate to the latest migration through the queue's serialized writer.
    ///
    /// No other access to the queue runs until the whole migration is done.
    pub async fn migrate_queue(&self, queue: &DatabaseQueue) -> MigrateResult<()> {
        let migrator = self.clone();
        queue
            .write_async(move |conn| migrator.migrate(conn))
            .await
    }

    /// Schedule a migration to the latest migration and return immediately.
    ///
    /// `completion` runs on the blocking thread pool once the migration is
    /// over, still holding the queue's writer: it receives the connection on
    /// success or the error that stopped the migration.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn migrate_async<F>(&self, queue: &DatabaseQueue, completion: F) -> tokio::task::JoinHandle<()>
    where
        F: FnOnce(MigrateResult<&mut Connection>) + Send + 'static,
    {
        let migrator = self.clone();
        let queue = queue.clone();
        tokio::task::spawn_blocking(move || {
            let mut completion = Some(completion);
            let outcome = queue.write(|conn| -> MigrateResult<()> {
                let result = migrator.migrate(conn);
                if let Some(completion) = completion.take() {
                    match result {
                        Ok(()) => completion(Ok(conn)),
                        Err(err) => completion(Err(err)),
                    }
                }
                Ok(())
            });
            if let (Err(err), Some(completion)) = (outcome, completion.take()) {
                completion(Err(err));
            }
        })
    }

    /// Whether the live schema differs from what the registered migrations
    /// produce, or the ledger holds identifiers this migrator does not know.
    ///
    /// Only migrations up to the last applied registered one are replayed.
    pub fn has_schema_changes(&self, conn: &Connection) -> MigrateResult<bool> {
        Ok(self.schema_drift(conn)?.is_drift())
    }

    /// Same check as [`has_schema_changes`](Self::has_schema_changes), with
    /// details about what differs.
    pub fn schema_drift(&self, conn: &Connection) -> MigrateResult<Drift> {
        drift::detect(&self.migrations, conn, &self.connection_config)
    }

    /// Every identifier in the ledger, registered or not.
    pub fn applied_identifiers(&self, conn: &Connection) -> MigrateResult<BTreeSet<String>> {
        ledger::applied_identifiers(conn)
    }

    /// Registered migrations present in the ledger, in registration order.
    pub fn applied_migrations(&self, conn: &Connection) -> MigrateResult<Vec<String>> {
        let applied = ledger::applied_identifiers(conn)?;
        Ok(self
            .migrations
            .iter()
            .map(Migration::identifier)
            .filter(|id| applied.contains(*id))
            .map(str::to_string)
            .collect())
    }

    /// The longest run of registered migrations, from the first one, that
    /// are all applied.
    pub fn completed_migrations(&self, conn: &Connection) -> MigrateResult<Vec<String>> {
        let applied = ledger::applied_identifiers(conn)?;
        Ok(self
            .migrations
            .iter()
            .map(Migration::identifier)
            .take_while(|id| applied.contains(*id))
            .map(str::to_string)
            .collect())
    }

    /// Whether every registered migration is completed.
    pub fn has_completed_migrations(&self, conn: &Connection) -> MigrateResult<bool> {
        let completed = self.completed_migrations(conn)?;
        Ok(completed.len() == self.migrations.len())
    }

    /// Whether the ledger holds an identifier this migrator does not know:
    /// the database was migrated by a newer (or different) migrator.
    pub fn has_been_superseded(&self, conn: &Connection) -> MigrateResult<bool> {
        let applied = ledger::applied_identifiers(conn)?;
        Ok(applied
            .iter()
            .any(|id| !self.migrations.iter().any(|m| m.identifier() == id)))
    }
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
