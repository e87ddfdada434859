//! Check command implementation

use anyhow::{Context, Result};
use keel_migrate::drift::Drift;
use keel_migrate::MigrateResult;

use crate::cli::{CheckArgs, GlobalArgs};
use crate::commands::common::{self, load_project, ExitCode};

/// Execute the check command
pub(crate) async fn execute(args: &CheckArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let migrator = common::build_migrator(&project)?;
    let path = common::database_path(&project, global);

    let Some(queue) = common::open_existing(&project, global)? else {
        println!("Database {} does not exist yet", path.display());
        return Ok(());
    };

    let checker = migrator.clone();
    let drift = queue
        .write_async(move |conn| checker.schema_drift(conn))
        .await
        .context("Failed to compare schemas")?;

    match &drift {
        Drift::None => {
            println!("Schema matches migrations");
            return Ok(());
        }
        Drift::UnknownMigrations(ids) => {
            println!("Database holds migrations this project does not define:");
            for id in ids {
                println!("  ? {id}");
            }
        }
        Drift::SchemaMismatch {
            replayed_to,
            live_only,
            expected_only,
        } => {
            println!("Schema differs from migrations replayed through {replayed_to}:");
            for object in live_only {
                println!("  + {object}");
            }
            for object in expected_only {
                println!("  - {object}");
            }
        }
    }

    if !args.fix {
        return Err(ExitCode(1).into());
    }

    queue
        .write_async(move |conn| -> MigrateResult<()> {
            keel_db::erase(conn)?;
            migrator.migrate(conn)
        })
        .await
        .with_context(|| format!("Failed to rebuild {}", path.display()))?;
    println!("Erased and re-migrated {}", path.display());
    Ok(())
}
