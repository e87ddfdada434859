//! The ledger table recording applied migration identifiers.
//!
//! A row's presence means the migration was applied and committed. Rows are
//! unordered: application order always comes from the registered list.

use crate::error::MigrateResult;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::collections::BTreeSet;

/// Name of the ledger table, reserved for the engine.
pub const LEDGER_TABLE: &str = "keel_migrations";

/// Create the ledger table if it does not exist yet.
pub fn ensure_table(conn: &Connection) -> MigrateResult<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (identifier TEXT NOT NULL PRIMARY KEY)"
    ))?;
    Ok(())
}

/// Whether the ledger table exists.
pub fn table_exists(conn: &Connection) -> MigrateResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [LEDGER_TABLE],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Every identifier recorded in the ledger, including ones the current
/// migrator does not know. A database without a ledger has applied nothing.
pub fn applied_identifiers(conn: &Connection) -> MigrateResult<BTreeSet<String>> {
    if !table_exists(conn)? {
        return Ok(BTreeSet::new());
    }
    let mut stmt = conn.prepare(&format!("SELECT identifier FROM {LEDGER_TABLE}"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let identifiers = rows.collect::<Result<BTreeSet<_>, _>>()?;
    Ok(identifiers)
}

/// Record a migration as applied.
pub fn record(conn: &Connection, identifier: &str) -> MigrateResult<()> {
    conn.execute(
        &format!("INSERT INTO {LEDGER_TABLE} (identifier) VALUES (?1)"),
        [identifier],
    )?;
    Ok(())
}

/// Remove identifiers from the ledger in a single statement.
pub fn remove(conn: &Connection, identifiers: &BTreeSet<String>) -> MigrateResult<usize> {
    if identifiers.is_empty() {
        return Ok(0);
    }
    let placeholders = vec!["?"; identifiers.len()].join(", ");
    let removed = conn.execute(
        &format!("DELETE FROM {LEDGER_TABLE} WHERE identifier IN ({placeholders})"),
        params_from_iter(identifiers.iter()),
    )?;
    Ok(removed)
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
