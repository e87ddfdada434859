//! keel-migrate - Migration engine for Keel
//!
//! Migrations are registered, in order, on a [`Migrator`]. Migrating a
//! database applies every registered migration missing from its ledger
//! table, each one in its own transaction, with the foreign key protocol
//! selected by the migration's [`ForeignKeyChecks`]. A migrator can also
//! tell whether the live schema still matches what its migrations produce
//! ([`Migrator::has_schema_changes`]).

pub mod drift;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod migration;
pub mod migrator;
pub mod planner;

pub use error::{BoxError, MigrateError, MigrateResult};
pub use migration::{ForeignKeyChecks, Migration, Transform};
pub use migrator::Migrator;
pub use planner::PlanStep;
