//! Plan execution: transactions, foreign key protocol, ledger updates.
//!
//! Each step commits on its own. The first failing step stops the plan;
//! steps committed before it stay committed.

use crate::error::{MigrateError, MigrateResult};
use crate::ledger;
use crate::migration::{ForeignKeyChecks, Migration};
use crate::planner::PlanStep;
use keel_db::{foreign_key_violations, foreign_keys_enabled, with_foreign_keys_disabled};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;

/// Execute `steps` left to right.
pub fn execute(conn: &mut Connection, steps: &[PlanStep<'_>]) -> MigrateResult<()> {
    for step in steps {
        match step {
            PlanStep::Run {
                migration,
                applied_merged,
            } => run(conn, migration, applied_merged)?,
            PlanStep::CleanupMerged {
                migration,
                identifiers,
            } => cleanup_merged(conn, migration, identifiers)?,
        }
    }
    Ok(())
}

/// Apply one migration with its foreign key policy.
///
/// When the connection does not enforce foreign keys at all, every policy
/// behaves like [`ForeignKeyChecks::Immediate`].
fn run(
    conn: &mut Connection,
    migration: &Migration,
    applied_merged: &BTreeSet<String>,
) -> MigrateResult<()> {
    let checks = if foreign_keys_enabled(conn)? {
        migration.checks()
    } else {
        ForeignKeyChecks::Immediate
    };
    log::debug!(
        "Running migration {} (foreign key checks: {checks})",
        migration.identifier()
    );

    match checks {
        ForeignKeyChecks::Immediate => run_immediate(conn, migration, applied_merged),
        ForeignKeyChecks::Disabled => with_foreign_keys_disabled(conn, |conn| {
            run_immediate(conn, migration, applied_merged)
        }),
        ForeignKeyChecks::Deferred => with_foreign_keys_disabled(conn, |conn| {
            run_deferred(conn, migration, applied_merged)
        }),
    }?;

    log::info!("Applied migration {}", migration.identifier());
    Ok(())
}

fn run_immediate(
    conn: &mut Connection,
    migration: &Migration,
    applied_merged: &BTreeSet<String>,
) -> MigrateResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    apply(&tx, migration, applied_merged)?;
    tx.commit()?;
    Ok(())
}

/// Enforcement is already off here. Violations are looked for once, after
/// the transform and the ledger insert, and roll the whole step back.
fn run_deferred(
    conn: &mut Connection,
    migration: &Migration,
    applied_merged: &BTreeSet<String>,
) -> MigrateResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    apply(&tx, migration, applied_merged)?;

    let violations = foreign_key_violations(&tx)?;
    if !violations.is_empty() {
        log::debug!(
            "Migration {} left {} foreign key violation(s), rolling back",
            migration.identifier(),
            violations.len()
        );
        return Err(MigrateError::ForeignKeyViolation {
            identifier: migration.identifier().to_string(),
            violations,
        });
    }

    tx.commit()?;
    Ok(())
}

/// Transform, ledger insert and removal of the merged rows it replaces,
/// inside the caller's transaction.
fn apply(
    tx: &Transaction<'_>,
    migration: &Migration,
    applied_merged: &BTreeSet<String>,
) -> MigrateResult<()> {
    migration
        .run(tx, applied_merged)
        .map_err(|source| MigrateError::Transform {
            identifier: migration.identifier().to_string(),
            source,
        })?;
    ledger::record(tx, migration.identifier())?;
    ledger::remove(tx, applied_merged)?;
    Ok(())
}

fn cleanup_merged(
    conn: &mut Connection,
    migration: &Migration,
    identifiers: &BTreeSet<String>,
) -> MigrateResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let removed = ledger::remove(&tx, identifiers)?;
    tx.commit()?;
    log::debug!(
        "Removed {removed} ledger row(s) merged into {}",
        migration.identifier()
    );
    Ok(())
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
