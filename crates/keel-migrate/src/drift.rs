//! Schema drift detection.
//!
//! Replays the registered migrations into a shadow database and compares
//! the resulting schema with the live one.

use crate::error::MigrateResult;
use crate::executor;
use crate::ledger::{self, LEDGER_TABLE};
use crate::migration::Migration;
use crate::planner;
use keel_db::{
    foreign_keys_enabled, set_foreign_keys_enabled, ConnectionConfig, SchemaInfo,
    ShadowDatabase,
};
use rusqlite::Connection;
use std::collections::BTreeSet;
use std::path::Path;

/// Outcome of a drift check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// The live schema matches what the registered migrations produce
    None,
    /// The ledger holds identifiers that are not registered
    UnknownMigrations(BTreeSet<String>),
    /// The live schema differs from the replayed one
    SchemaMismatch {
        /// Identifier the shadow database was migrated to
        replayed_to: String,
        /// Objects only in the live database (or with different SQL)
        live_only: Vec<String>,
        /// Objects only in the shadow database (or with different SQL)
        expected_only: Vec<String>,
    },
}

impl Drift {
    pub fn is_drift(&self) -> bool {
        !matches!(self, Drift::None)
    }
}

/// Schema of `conn` without the ledger table and internal objects.
pub fn user_schema(conn: &Connection) -> MigrateResult<SchemaInfo> {
    Ok(SchemaInfo::load(conn, &[LEDGER_TABLE])?)
}

/// Compare the live database against a replay of `migrations`.
///
/// The shadow database is opened with `config`, with foreign key enforcement
/// matching the live connection, and is removed before this function
/// returns, whatever the outcome.
pub fn detect(
    migrations: &[Migration],
    conn: &Connection,
    config: &ConnectionConfig,
) -> MigrateResult<Drift> {
    detect_in(migrations, conn, config, &std::env::temp_dir())
}

/// [`detect`], with the shadow database created under `shadow_parent`.
pub fn detect_in(
    migrations: &[Migration],
    conn: &Connection,
    config: &ConnectionConfig,
    shadow_parent: &Path,
) -> MigrateResult<Drift> {
    let applied = ledger::applied_identifiers(conn)?;

    let registered: BTreeSet<&str> = migrations.iter().map(Migration::identifier).collect();
    let unknown: BTreeSet<String> = applied
        .iter()
        .filter(|id| !registered.contains(id.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        log::debug!("Ledger holds unregistered migrations: {unknown:?}");
        return Ok(Drift::UnknownMigrations(unknown));
    }

    let Some(target_index) = migrations
        .iter()
        .rposition(|m| applied.contains(m.identifier()))
    else {
        return Ok(Drift::None);
    };
    let target = migrations[target_index].identifier();

    let mut shadow = ShadowDatabase::create_in(config, shadow_parent)?;
    // Replay with the live enforcement so foreign key policies degrade alike
    set_foreign_keys_enabled(shadow.conn(), foreign_keys_enabled(conn)?)?;
    log::debug!("Replaying migrations up to {target} into shadow database");
    ledger::ensure_table(shadow.conn())?;
    let steps = planner::plan(migrations, target_index, &BTreeSet::new());
    executor::execute(shadow.conn_mut(), &steps)?;
    let expected = user_schema(shadow.conn())?;
    drop(shadow);

    let live = user_schema(conn)?;
    if live == expected {
        return Ok(Drift::None);
    }

    let describe = |objects: Vec<&keel_db::SchemaObject>| -> Vec<String> {
        objects
            .into_iter()
            .map(|o| format!("{} {}", o.kind, o.name))
            .collect()
    };
    Ok(Drift::SchemaMismatch {
        replayed_to: target.to_string(),
        live_only: describe(live.difference(&expected)),
        expected_only: describe(expected.difference(&live)),
    })
}

#[cfg(test)]
#[path = "drift_test.rs"]
mod tests;
