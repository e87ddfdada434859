//! Schema introspection over `sqlite_master`.

use crate::error::{DbError, DbResult};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Kind of a schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaObjectKind {
    Table,
    Index,
    View,
    Trigger,
}

impl SchemaObjectKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "table" => Some(SchemaObjectKind::Table),
            "index" => Some(SchemaObjectKind::Index),
            "view" => Some(SchemaObjectKind::View),
            "trigger" => Some(SchemaObjectKind::Trigger),
            _ => None,
        }
    }

    /// Keyword used in `CREATE` / `DROP` statements
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaObjectKind::Table => "table",
            SchemaObjectKind::Index => "index",
            SchemaObjectKind::View => "view",
            SchemaObjectKind::Trigger => "trigger",
        }
    }
}

impl fmt::Display for SchemaObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named object from `sqlite_master` with its defining SQL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SchemaObject {
    pub kind: SchemaObjectKind,
    pub name: String,
    /// Table the object belongs to (the object itself for tables and views)
    pub table_name: String,
    /// `None` for automatically created indexes
    pub sql: Option<String>,
}

impl SchemaObject {
    /// Objects SQLite creates and manages on its own
    pub fn is_internal(&self) -> bool {
        self.name.starts_with("sqlite_")
    }
}

/// The set of user-visible schema objects of a database.
///
/// Equality is order-independent: two databases have equal `SchemaInfo`
/// when they hold the same objects with the same SQL text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaInfo {
    objects: BTreeSet<SchemaObject>,
}

impl SchemaInfo {
    /// Read the schema, skipping internal `sqlite_*` objects and any object
    /// belonging to one of the `excluded_tables`.
    pub fn load(conn: &Connection, excluded_tables: &[&str]) -> DbResult<Self> {
        let mut stmt = conn
            .prepare("SELECT type, name, tbl_name, sql FROM sqlite_master")
            .map_err(|e| DbError::SchemaError(e.to_string()))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;

        let mut objects = BTreeSet::new();
        for row in rows {
            let (kind, name, table_name, sql) = row?;
            let kind = SchemaObjectKind::parse(&kind).ok_or_else(|| {
                DbError::SchemaError(format!("unknown object type '{kind}' for {name}"))
            })?;
            let object = SchemaObject {
                kind,
                name,
                table_name,
                sql,
            };
            if object.is_internal()
                || excluded_tables
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(&object.table_name))
            {
                continue;
            }
            objects.insert(object);
        }
        Ok(Self { objects })
    }

    /// Iterate objects in a stable order (kind, then name).
    pub fn iter(&self) -> impl Iterator<Item = &SchemaObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects present in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a SchemaInfo) -> Vec<&'a SchemaObject> {
        self.objects.difference(&other.objects).collect()
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
