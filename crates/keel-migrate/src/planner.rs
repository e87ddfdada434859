//! Execution planning.
//!
//! Given the registered migrations, a target, and a snapshot of the ledger,
//! compute what must run to bring the ledger up to the target.

use crate::error::{MigrateError, MigrateResult};
use crate::migration::Migration;
use std::collections::BTreeSet;

/// One unit of work in an execution plan.
#[derive(Debug)]
pub enum PlanStep<'a> {
    /// Apply a migration that is missing from the ledger
    Run {
        migration: &'a Migration,
        /// Merged identifiers of `migration` already in the ledger
        applied_merged: BTreeSet<String>,
    },
    /// Delete ledger rows for identifiers an applied migration has replaced
    CleanupMerged {
        migration: &'a Migration,
        identifiers: BTreeSet<String>,
    },
}

impl PlanStep<'_> {
    pub fn migration(&self) -> &Migration {
        match self {
            PlanStep::Run { migration, .. } | PlanStep::CleanupMerged { migration, .. } => {
                migration
            }
        }
    }
}

/// Index of `target` in the registered list.
pub fn position(migrations: &[Migration], target: &str) -> MigrateResult<usize> {
    migrations
        .iter()
        .position(|m| m.identifier() == target)
        .ok_or_else(|| MigrateError::UnknownMigration {
            identifier: target.to_string(),
        })
}

/// Fail when the ledger already records a migration registered after
/// `target_index`: the database is ahead of the requested target.
pub fn ensure_not_ahead(
    migrations: &[Migration],
    target_index: usize,
    ledger: &BTreeSet<String>,
) -> MigrateResult<()> {
    let ahead = migrations[target_index + 1..]
        .iter()
        .find(|m| ledger.contains(m.identifier()));
    match ahead {
        Some(applied) => Err(MigrateError::DatabaseAhead {
            target: migrations[target_index].identifier().to_string(),
            applied: applied.identifier().to_string(),
        }),
        None => Ok(()),
    }
}

/// Plan the work for the registered prefix ending at `target_index`.
///
/// Steps come out in registration order. A migration already in the ledger
/// produces nothing, or a cleanup step when some of the identifiers it
/// replaces are still recorded.
pub fn plan<'a>(
    migrations: &'a [Migration],
    target_index: usize,
    ledger: &BTreeSet<String>,
) -> Vec<PlanStep<'a>> {
    migrations[..=target_index]
        .iter()
        .filter_map(|migration| {
            let applied_merged = migration.applied_merged(ledger);
            if !ledger.contains(migration.identifier()) {
                Some(PlanStep::Run {
                    migration,
                    applied_merged,
                })
            } else if applied_merged.is_empty() {
                None
            } else {
                Some(PlanStep::CleanupMerged {
                    migration,
                    identifiers: applied_merged,
                })
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "planner_test.rs"]
mod tests;
