use super::*;
use keel_db::JournalMode;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config: Config = serde_yaml::from_str("name: app\ndatabase: app.sqlite\n").unwrap();
    assert_eq!(config.name, "app");
    assert_eq!(config.migrations_dir, PathBuf::from("migrations"));
    assert!(!config.erase_on_schema_change);
    assert_eq!(config.foreign_key_checks, ForeignKeyChecks::Deferred);
    assert!(config.connection.foreign_keys);
    assert_eq!(config.connection.busy_timeout_ms, 5_000);
    assert_eq!(config.connection.journal_mode, JournalMode::Default);
}

#[test]
fn test_full_config() {
    let yaml = r#"
name: inventory
database: data/inventory.sqlite
migrations_dir: db/migrations
erase_on_schema_change: true
foreign_key_checks: immediate
connection:
  foreign_keys: false
  busy_timeout_ms: 250
  journal_mode: wal
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.database, PathBuf::from("data/inventory.sqlite"));
    assert_eq!(config.migrations_dir, PathBuf::from("db/migrations"));
    assert!(config.erase_on_schema_change);
    assert_eq!(config.foreign_key_checks, ForeignKeyChecks::Immediate);
    assert!(!config.connection.foreign_keys);
    assert_eq!(config.connection.busy_timeout_ms, 250);
    assert_eq!(config.connection.journal_mode, JournalMode::Wal);
}

#[test]
fn test_unknown_field_is_rejected() {
    let result: Result<Config, _> =
        serde_yaml::from_str("name: app\ndatabase: app.sqlite\nmodel_paths: [x]\n");
    assert!(result.is_err());
}

#[test]
fn test_load_from_dir_prefers_yml() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "keel.yml", "name: from_yml\ndatabase: a.sqlite\n");
    write(dir.path(), "keel.yaml", "name: from_yaml\ndatabase: b.sqlite\n");
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "from_yml");
}

#[test]
fn test_load_from_dir_falls_back_to_yaml() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "keel.yaml", "name: from_yaml\ndatabase: b.sqlite\n");
    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.name, "from_yaml");
}

#[test]
fn test_missing_config() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, ProjectError::ConfigNotFound { .. }));
    assert!(err.to_string().starts_with("[P001]"));
}

#[test]
fn test_invalid_yaml() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "keel.yml", "name: [unclosed\n");
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, ProjectError::ConfigParseError { .. }));
}

#[test]
fn test_empty_name_is_invalid() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "keel.yml", "name: \"\"\ndatabase: a.sqlite\n");
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, ProjectError::ConfigInvalid { .. }));
}

#[test]
fn test_zero_busy_timeout_is_invalid() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "keel.yml",
        "name: app\ndatabase: a.sqlite\nconnection:\n  busy_timeout_ms: 0\n",
    );
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(err.to_string().contains("busy_timeout_ms"));
}

#[test]
fn test_project_paths_resolve_against_root() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "keel.yml",
        "name: app\ndatabase: data/app.sqlite\nmigrations_dir: sql\n",
    );
    let project = Project::load(dir.path()).unwrap();
    assert_eq!(project.database_path(), dir.path().join("data/app.sqlite"));
    assert_eq!(project.migrations_path(), dir.path().join("sql"));
}
