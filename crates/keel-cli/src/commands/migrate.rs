//! Migrate command implementation

use anyhow::{Context, Result};
use keel_migrate::{planner, MigrateResult, PlanStep};
use std::collections::BTreeSet;

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{self, load_project};

/// Execute the migrate command
pub(crate) async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let migrator = common::build_migrator(&project)?;
    let path = common::database_path(&project, global);

    if migrator.migrations().is_empty() {
        println!(
            "No migrations found in {}",
            project.migrations_path().display()
        );
        return Ok(());
    }

    let target_index = match &args.to {
        Some(target) => planner::position(migrator.migrations(), target)?,
        None => migrator.migrations().len() - 1,
    };

    if args.dry_run {
        let mut applied = BTreeSet::new();
        if let Some(queue) = common::open_existing(&project, global)? {
            let will_erase = migrator.erases_database_on_schema_change()
                && queue.read(|conn| migrator.has_schema_changes(conn))?;
            if will_erase {
                println!(
                    "Schema drift detected: the database will be erased and migrated from scratch"
                );
            } else {
                applied = queue.read(|conn| migrator.applied_identifiers(conn))?;
            }
        }
        planner::ensure_not_ahead(migrator.migrations(), target_index, &applied)?;
        let steps = planner::plan(migrator.migrations(), target_index, &applied);
        if steps.is_empty() {
            println!("Database is up to date");
        }
        for step in &steps {
            match step {
                PlanStep::Run { migration, .. } => {
                    println!("  run      {}", migration.identifier())
                }
                PlanStep::CleanupMerged {
                    migration,
                    identifiers,
                } => println!(
                    "  cleanup  {} (merges {})",
                    migration.identifier(),
                    identifiers.iter().cloned().collect::<Vec<_>>().join(", ")
                ),
            }
        }
        return Ok(());
    }

    let queue = common::open_queue(&project, global)?;
    let before = queue.read(|conn| migrator.applied_migrations(conn))?;

    let target = args.to.clone();
    let worker = migrator.clone();
    queue
        .write_async(move |conn| -> MigrateResult<()> {
            match target {
                Some(target) => worker.migrate_to(conn, &target),
                None => worker.migrate(conn),
            }
        })
        .await
        .with_context(|| format!("Failed to migrate {}", path.display()))?;

    let after = queue.read(|conn| migrator.applied_migrations(conn))?;
    let newly: Vec<&String> = after.iter().filter(|id| !before.contains(id)).collect();
    if newly.is_empty() {
        println!("Database is up to date");
    } else {
        println!("Applied {} migration(s) to {}", newly.len(), path.display());
        for id in newly {
            println!("  ✓ {id}");
        }
    }
    Ok(())
}
