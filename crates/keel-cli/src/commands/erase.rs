//! Erase command implementation

use anyhow::{bail, Context, Result};

use crate::cli::{EraseArgs, GlobalArgs};
use crate::commands::common::{self, load_project};

/// Execute the erase command
pub(crate) async fn execute(args: &EraseArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let path = common::database_path(&project, global);

    if !args.yes {
        bail!(
            "Refusing to erase {} without --yes: every table and row will be lost",
            path.display()
        );
    }

    let Some(queue) = common::open_existing(&project, global)? else {
        println!("Database {} does not exist; nothing to erase", path.display());
        return Ok(());
    };

    queue
        .write_async(|conn| keel_db::erase(conn))
        .await
        .with_context(|| format!("Failed to erase {}", path.display()))?;
    println!("Erased {}", path.display());
    Ok(())
}
