//! Foreign key enforcement toggling and on-demand constraint checks.
//!
//! SQLite ignores `PRAGMA foreign_keys` inside a transaction, so every
//! toggle here must happen between transactions.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use std::fmt;

/// One row reported by `PRAGMA foreign_key_check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyViolation {
    /// Table holding the offending row
    pub table: String,
    /// Rowid of the offending row (`None` for WITHOUT ROWID tables)
    pub rowid: Option<i64>,
    /// Table the foreign key refers to
    pub parent: String,
    /// Index of the foreign key in `PRAGMA foreign_key_list(table)`
    pub foreign_key_id: i64,
}

impl fmt::Display for ForeignKeyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rowid {
            Some(rowid) => write!(
                f,
                "{}[rowid {}] -> {} (foreign key #{})",
                self.table, rowid, self.parent, self.foreign_key_id
            ),
            None => write!(
                f,
                "{} -> {} (foreign key #{})",
                self.table, self.parent, self.foreign_key_id
            ),
        }
    }
}

/// Whether the connection currently enforces foreign keys.
pub fn foreign_keys_enabled(conn: &Connection) -> DbResult<bool> {
    let enabled = conn.pragma_query_value(None, "foreign_keys", |row| row.get::<_, bool>(0))?;
    Ok(enabled)
}

/// Turn foreign key enforcement on or off.
pub fn set_foreign_keys_enabled(conn: &Connection, enabled: bool) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", enabled)?;
    Ok(())
}

/// List every foreign key constraint currently violated in the main schema.
pub fn foreign_key_violations(conn: &Connection) -> DbResult<Vec<ForeignKeyViolation>> {
    let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
    let rows = stmt.query_map([], |row| {
        Ok(ForeignKeyViolation {
            table: row.get(0)?,
            rowid: row.get(1)?,
            parent: row.get(2)?,
            foreign_key_id: row.get(3)?,
        })
    })?;
    let violations = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(violations)
}

/// Run `body` with foreign key enforcement turned off, turning it back on
/// afterwards on every exit path.
///
/// A connection that does not enforce foreign keys runs `body` as is and is
/// left untouched.
///
/// When `body` fails and re-enabling fails too, the error from `body` is
/// returned and the re-enabling error is only logged.
pub fn with_foreign_keys_disabled<T, E, F>(conn: &mut Connection, body: F) -> Result<T, E>
where
    F: FnOnce(&mut Connection) -> Result<T, E>,
    E: From<DbError>,
{
    if !foreign_keys_enabled(conn)? {
        return body(conn);
    }
    set_foreign_keys_enabled(conn, false)?;
    let result = body(conn);
    let restored = set_foreign_keys_enabled(conn, true);

    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(restore_err)) => Err(restore_err.into()),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(restore_err)) => {
            log::warn!("Failed to re-enable foreign keys after an earlier error: {restore_err}");
            Err(err)
        }
    }
}

#[cfg(test)]
#[path = "foreign_keys_test.rs"]
mod tests;
