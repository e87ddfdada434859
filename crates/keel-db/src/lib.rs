//! keel-db - SQLite access layer for Keel
//!
//! This crate wraps `rusqlite` with the primitives the migration engine
//! relies on: a serialized [`DatabaseQueue`], connection configuration,
//! foreign key toggling and checking, schema introspection, database
//! erasure, and disposable shadow databases.

pub mod config;
pub mod erase;
pub mod error;
pub mod foreign_keys;
pub mod queue;
pub mod schema;
pub mod shadow;

pub use config::{ConnectionConfig, JournalMode, PrepareHook};
pub use erase::erase;
pub use error::{DbError, DbResult};
pub use foreign_keys::{
    foreign_key_violations, foreign_keys_enabled, set_foreign_keys_enabled,
    with_foreign_keys_disabled, ForeignKeyViolation,
};
pub use queue::DatabaseQueue;
pub use schema::{SchemaInfo, SchemaObject, SchemaObjectKind};
pub use shadow::ShadowDatabase;

/// Quote an SQL identifier, doubling any embedded double quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
