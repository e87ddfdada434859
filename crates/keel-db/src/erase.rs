//! Erase every user object from a database.

use crate::error::DbResult;
use crate::foreign_keys::with_foreign_keys_disabled;
use crate::quote_identifier;
use rusqlite::{Connection, TransactionBehavior};

/// Drop all user tables, views, triggers and indexes, reset
/// `user_version`, and reclaim the freed pages.
///
/// Foreign key enforcement is suspended while tables are dropped so that
/// drop order does not matter.
pub fn erase(conn: &mut Connection) -> DbResult<()> {
    with_foreign_keys_disabled(conn, |conn| -> DbResult<()> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let objects = {
            let mut stmt = tx.prepare(
                "SELECT type, name FROM sqlite_master
                 WHERE type IN ('trigger', 'view', 'table') AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
                 ORDER BY CASE type WHEN 'trigger' THEN 0 WHEN 'view' THEN 1 ELSE 2 END",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        for (kind, name) in &objects {
            log::debug!("Dropping {kind} {name}");
            tx.execute_batch(&format!(
                "DROP {} IF EXISTS {}",
                kind.to_uppercase(),
                quote_identifier(name)
            ))?;
        }

        let has_sequence: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence')",
            [],
            |row| row.get(0),
        )?;
        if has_sequence {
            tx.execute("DELETE FROM sqlite_sequence", [])?;
        }

        tx.pragma_update(None, "user_version", 0)?;
        tx.commit()?;
        Ok(())
    })?;

    conn.execute_batch("VACUUM")?;
    log::info!("Database erased");
    Ok(())
}

#[cfg(test)]
#[path = "erase_test.rs"]
mod tests;
