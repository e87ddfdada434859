//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use keel_db::DatabaseQueue;
use keel_migrate::Migrator;
use std::fmt;
use std::path::PathBuf;

use crate::cli::GlobalArgs;
use crate::config::Project;
use crate::source;

/// Error type representing a non-zero process exit code.
///
/// Return `Err(ExitCode(N).into())` instead of calling `std::process::exit`
/// so destructors (open connections, temp dirs) still run.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command already reported what went wrong.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load the project configuration from `--project-dir`
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    Project::load(&global.project_dir).with_context(|| {
        format!(
            "Failed to load project from {}",
            global.project_dir.display()
        )
    })
}

/// Database file to operate on: `--database` when given, else the project's
pub(crate) fn database_path(project: &Project, global: &GlobalArgs) -> PathBuf {
    global
        .database
        .clone()
        .unwrap_or_else(|| project.database_path())
}

/// Build a migrator from the project's SQL migration files
pub(crate) fn build_migrator(project: &Project) -> Result<Migrator> {
    let dir = project.migrations_path();
    let migrations = source::load_migrations(&dir)
        .with_context(|| format!("Failed to load migrations from {}", dir.display()))?;

    let config = &project.config;
    let mut migrator = Migrator::new()
        .erase_database_on_schema_change(config.erase_on_schema_change)
        .with_connection_config(config.connection.clone());
    source::register_all(&mut migrator, migrations, config.foreign_key_checks)
        .context("Failed to register migrations")?;
    Ok(migrator)
}

/// Open the database, creating it and its parent directory when missing
pub(crate) fn open_queue(project: &Project, global: &GlobalArgs) -> Result<DatabaseQueue> {
    let path = database_path(project, global);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    DatabaseQueue::open(&path, project.config.connection.clone())
        .with_context(|| format!("Failed to open database {}", path.display()))
}

/// Open the database if it exists. Read-only commands never create it.
pub(crate) fn open_existing(
    project: &Project,
    global: &GlobalArgs,
) -> Result<Option<DatabaseQueue>> {
    if database_path(project, global).exists() {
        open_queue(project, global).map(Some)
    } else {
        Ok(None)
    }
}
