//! Error types for loading a Keel project

use thiserror::Error;

/// Errors raised while reading `keel.yml` and the migrations directory
#[derive(Error, Debug)]
pub enum ProjectError {
    /// P001: Configuration file not found
    #[error("[P001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// P002: Failed to parse configuration file
    #[error("[P002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// P003: Invalid configuration value
    #[error("[P003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// P004: Migrations directory not found
    #[error("[P004] Migrations directory not found: {path}")]
    MigrationsDirNotFound { path: String },

    /// P005: Malformed `-- keel:` directive in a migration file
    #[error("[P005] Invalid directive in {path} line {line}: {message}")]
    InvalidDirective {
        path: String,
        line: usize,
        message: String,
    },

    /// P006: IO error with file path context
    #[error("[P006] IO error at {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_yaml::Error> for ProjectError {
    fn from(err: serde_yaml::Error) -> Self {
        ProjectError::ConfigParseError {
            message: err.to_string(),
        }
    }
}

/// Result type alias for ProjectError
pub type ProjectResult<T> = Result<T, ProjectError>;
