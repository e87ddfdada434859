//! Status command implementation

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::cli::{GlobalArgs, StatusArgs, StatusOutput};
use crate::commands::common::{self, load_project};

#[derive(Debug, Serialize)]
struct MigrationStatus {
    identifier: String,
    applied: bool,
    completed: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    project: String,
    database: String,
    exists: bool,
    complete: bool,
    migrations: Vec<MigrationStatus>,
    superseded_by: Vec<String>,
}

/// Execute the status command
pub(crate) async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let migrator = common::build_migrator(&project)?;
    let path = common::database_path(&project, global);

    let queue = common::open_existing(&project, global)?;
    let (ledger, completed) = match &queue {
        Some(queue) => queue.read(|conn| -> keel_migrate::MigrateResult<_> {
            Ok((
                migrator.applied_identifiers(conn)?,
                migrator.completed_migrations(conn)?,
            ))
        })?,
        None => (BTreeSet::new(), Vec::new()),
    };

    let migrations: Vec<MigrationStatus> = migrator
        .migrations()
        .iter()
        .map(|m| MigrationStatus {
            identifier: m.identifier().to_string(),
            applied: ledger.contains(m.identifier()),
            completed: completed.iter().any(|id| id == m.identifier()),
        })
        .collect();
    let superseded_by: Vec<String> = ledger
        .iter()
        .filter(|id| !migrations.iter().any(|m| &m.identifier == *id))
        .cloned()
        .collect();

    let report = StatusReport {
        project: project.config.name.clone(),
        database: path.display().to_string(),
        exists: queue.is_some(),
        complete: completed.len() == migrations.len(),
        migrations,
        superseded_by,
    };

    match args.output {
        StatusOutput::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        StatusOutput::Table => print_table(&report),
    }
    Ok(())
}

fn print_table(report: &StatusReport) {
    println!("{} ({})", report.project, report.database);
    if !report.exists {
        println!("Database does not exist yet");
    }

    let width = report
        .migrations
        .iter()
        .map(|m| m.identifier.len())
        .max()
        .unwrap_or(0)
        .max("MIGRATION".len());
    println!("{:<width$}  STATUS", "MIGRATION");
    for m in &report.migrations {
        let status = match (m.applied, m.completed) {
            (true, true) => "applied",
            (true, false) => "applied (out of order)",
            (false, _) => "pending",
        };
        println!("{:<width$}  {status}", m.identifier);
    }

    let applied = report.migrations.iter().filter(|m| m.applied).count();
    println!();
    println!("{applied} of {} migration(s) applied", report.migrations.len());
    if !report.superseded_by.is_empty() {
        println!(
            "Database was migrated by a newer version: unknown migration(s) {}",
            report.superseded_by.join(", ")
        );
    }
}
