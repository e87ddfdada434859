//! SQL migration files.
//!
//! Every `*.sql` file in the migrations directory is one migration, applied
//! in file name order. The identifier is the file stem. Directives in the
//! leading comment block tune how the migration is registered:
//!
//! ```sql
//! -- keel:merges 002_add_email, 003_add_phone
//! -- keel:foreign_keys immediate
//! CREATE TABLE ...
//! ```

use crate::error::{ProjectError, ProjectResult};
use keel_migrate::{ForeignKeyChecks, Migration, MigrateResult, Migrator};
use std::path::{Path, PathBuf};

const DIRECTIVE_PREFIX: &str = "keel:";

/// A migration read from a `.sql` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlMigration {
    pub identifier: String,
    pub path: PathBuf,
    pub sql: String,
    pub merges: Vec<String>,
    pub foreign_key_checks: Option<ForeignKeyChecks>,
}

impl SqlMigration {
    /// Parse one migration file
    pub fn from_file(path: &Path) -> ProjectResult<Self> {
        let identifier = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
            .ok_or_else(|| ProjectError::IoWithPath {
                path: path.display().to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "migration file name is not valid UTF-8",
                ),
            })?;
        let sql = std::fs::read_to_string(path).map_err(|e| ProjectError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(identifier, path, sql)
    }

    fn parse(identifier: String, path: &Path, sql: String) -> ProjectResult<Self> {
        let mut merges = Vec::new();
        let mut foreign_key_checks = None;

        for (index, line) in sql.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(comment) = line.strip_prefix("--") else {
                break;
            };
            let Some(directive) = comment.trim_start().strip_prefix(DIRECTIVE_PREFIX) else {
                continue;
            };

            let invalid = |message: String| ProjectError::InvalidDirective {
                path: path.display().to_string(),
                line: index + 1,
                message,
            };
            let (name, value) = directive
                .trim()
                .split_once(char::is_whitespace)
                .unwrap_or((directive.trim(), ""));
            match name {
                "merges" => {
                    let ids: Vec<String> = value
                        .split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect();
                    if ids.is_empty() {
                        return Err(invalid("merges needs at least one identifier".to_string()));
                    }
                    merges.extend(ids);
                }
                "foreign_keys" => {
                    if foreign_key_checks.is_some() {
                        return Err(invalid("foreign_keys is set more than once".to_string()));
                    }
                    foreign_key_checks = Some(value.parse().map_err(invalid)?);
                }
                other => return Err(invalid(format!("unknown directive '{other}'"))),
            }
        }

        Ok(Self {
            identifier,
            path: path.to_path_buf(),
            sql,
            merges,
            foreign_key_checks,
        })
    }

    /// Convert into a registrable migration, falling back to `default_checks`
    /// when the file has no `foreign_keys` directive
    pub fn into_migration(self, default_checks: ForeignKeyChecks) -> Migration {
        Migration::sql(self.identifier, self.sql)
            .merging(self.merges)
            .foreign_key_checks(self.foreign_key_checks.unwrap_or(default_checks))
    }
}

/// Load every `*.sql` file in `dir`, sorted by file name
pub fn load_migrations(dir: &Path) -> ProjectResult<Vec<SqlMigration>> {
    if !dir.is_dir() {
        return Err(ProjectError::MigrationsDirNotFound {
            path: dir.display().to_string(),
        });
    }

    let io_err = |e| ProjectError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut migrations = Vec::with_capacity(paths.len());
    for path in paths {
        let migration = SqlMigration::from_file(&path)?;
        log::debug!("Loaded migration {} from {}", migration.identifier, path.display());
        migrations.push(migration);
    }
    Ok(migrations)
}

/// Register `migrations`, in order, on `migrator`
pub fn register_all(
    migrator: &mut Migrator,
    migrations: Vec<SqlMigration>,
    default_checks: ForeignKeyChecks,
) -> MigrateResult<()> {
    for migration in migrations {
        migrator.register(migration.into_migration(default_checks))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
