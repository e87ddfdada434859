//! Project configuration loaded from keel.yml

use crate::error::{ProjectError, ProjectResult};
use keel_db::ConnectionConfig;
use keel_migrate::ForeignKeyChecks;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main project configuration from keel.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// SQLite database file, relative to the project directory
    pub database: PathBuf,

    /// Directory holding the `*.sql` migration files
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,

    /// Erase and re-migrate the database when its schema drifts
    #[serde(default)]
    pub erase_on_schema_change: bool,

    /// Foreign key checks for migrations without a `foreign_keys` directive
    #[serde(default)]
    pub foreign_key_checks: ForeignKeyChecks,

    /// How connections to the database are opened
    #[serde(default)]
    pub connection: ConnectionConfig,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> ProjectResult<Self> {
        if !path.exists() {
            return Err(ProjectError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ProjectError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for keel.yml or keel.yaml
    pub fn load_from_dir(dir: &Path) -> ProjectResult<Self> {
        let yml_path = dir.join("keel.yml");
        let yaml_path = dir.join("keel.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(ProjectError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    fn validate(&self) -> ProjectResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProjectError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }
        if self.database.as_os_str().is_empty() {
            return Err(ProjectError::ConfigInvalid {
                message: "database must name a SQLite file".to_string(),
            });
        }
        if self.connection.busy_timeout_ms == 0 {
            return Err(ProjectError::ConfigInvalid {
                message: "connection.busy_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// A configuration together with the directory it was loaded from
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
}

impl Project {
    pub fn load(root: &Path) -> ProjectResult<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            config: Config::load_from_dir(root)?,
        })
    }

    /// Database file, resolved against the project directory
    pub fn database_path(&self) -> PathBuf {
        self.root.join(&self.config.database)
    }

    pub fn migrations_path(&self) -> PathBuf {
        self.root.join(&self.config.migrations_dir)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
