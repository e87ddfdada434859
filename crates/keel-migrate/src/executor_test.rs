//! Tests for the transaction and foreign key protocol.

use super::*;
use crate::planner::plan;
use keel_db::ConnectionConfig;

// ── Helpers ────────────────────────────────────────────────────────────

fn open() -> Connection {
    let conn = ConnectionConfig::default().open_in_memory().unwrap();
    ledger::ensure_table(&conn).unwrap();
    conn
}

fn open_without_foreign_keys() -> Connection {
    let config = ConnectionConfig {
        foreign_keys: false,
        ..ConnectionConfig::default()
    };
    let conn = config.open_in_memory().unwrap();
    ledger::ensure_table(&conn).unwrap();
    conn
}

fn run_all(conn: &mut Connection, migrations: &[Migration]) -> MigrateResult<()> {
    let applied = ledger::applied_identifiers(conn).unwrap();
    let steps = plan(migrations, migrations.len() - 1, &applied);
    execute(conn, &steps)
}

fn applied(conn: &Connection) -> Vec<String> {
    ledger::applied_identifiers(conn)
        .unwrap()
        .into_iter()
        .collect()
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .unwrap()
        > 0
}

const PARENT_CHILD: &str = "
    CREATE TABLE parent (id INTEGER PRIMARY KEY);
    CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id));
";

// ── Immediate ──────────────────────────────────────────────────────────

#[test]
fn test_immediate_success_records_ledger() {
    let mut conn = open();
    let migrations =
        vec![Migration::sql("v1", "CREATE TABLE t (a INT)").foreign_key_checks(ForeignKeyChecks::Immediate)];
    run_all(&mut conn, &migrations).unwrap();
    assert_eq!(applied(&conn), vec!["v1"]);
    assert!(table_exists(&conn, "t"));
}

#[test]
fn test_immediate_failure_rolls_back() {
    let mut conn = open();
    let migrations = vec![Migration::new("v1", |conn, _| {
        conn.execute_batch("CREATE TABLE t (a INT)")?;
        Err("transform gave up".into())
    })
    .foreign_key_checks(ForeignKeyChecks::Immediate)];

    let err = run_all(&mut conn, &migrations).unwrap_err();
    match &err {
        MigrateError::Transform { identifier, source } => {
            assert_eq!(identifier, "v1");
            assert_eq!(source.to_string(), "transform gave up");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(applied(&conn).is_empty());
    assert!(!table_exists(&conn, "t"));
}

#[test]
fn test_immediate_rejects_dangling_reference_per_statement() {
    let mut conn = open();
    let migrations = vec![
        Migration::sql("schema", PARENT_CHILD),
        Migration::sql("orphan", "INSERT INTO child (id, parent_id) VALUES (1, 42)")
            .foreign_key_checks(ForeignKeyChecks::Immediate),
    ];
    let err = run_all(&mut conn, &migrations).unwrap_err();
    assert!(matches!(err, MigrateError::Transform { ref identifier, .. } if identifier == "orphan"));
    assert_eq!(applied(&conn), vec!["schema"]);
}

// ── Deferred ───────────────────────────────────────────────────────────

#[test]
fn test_deferred_violation_fails_and_rolls_back() {
    let mut conn = open();
    let migrations = vec![
        Migration::sql("schema", PARENT_CHILD),
        Migration::sql("orphan", "INSERT INTO child (id, parent_id) VALUES (1, 42)")
            .foreign_key_checks(ForeignKeyChecks::Deferred),
    ];

    let err = run_all(&mut conn, &migrations).unwrap_err();
    match &err {
        MigrateError::ForeignKeyViolation {
            identifier,
            violations,
        } => {
            assert_eq!(identifier, "orphan");
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].table, "child");
            assert_eq!(violations[0].parent, "parent");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.is_usage_error());
    assert_eq!(applied(&conn), vec!["schema"]);
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM child", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 0);
    assert!(foreign_keys_enabled(&conn).unwrap());
}

#[test]
fn test_deferred_child_before_parent_table() {
    let mut conn = open();
    let migrations = vec![Migration::new("v1", |conn, _| {
        conn.execute_batch(
            "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id));
             INSERT INTO child (id, parent_id) VALUES (1, 1);
             CREATE TABLE parent (id INTEGER PRIMARY KEY);",
        )?;
        Ok(())
    })];

    let err = run_all(&mut conn, &migrations).unwrap_err();
    assert!(matches!(err, MigrateError::ForeignKeyViolation { .. }));
    assert!(applied(&conn).is_empty());
    assert!(!table_exists(&conn, "child"));
}

#[test]
fn test_deferred_tolerates_transient_violations() {
    let mut conn = open();
    let migrations = vec![
        Migration::sql("schema", PARENT_CHILD),
        Migration::sql(
            "reorder",
            "INSERT INTO child (id, parent_id) VALUES (1, 7);
             INSERT INTO parent (id) VALUES (7);",
        ),
    ];
    run_all(&mut conn, &migrations).unwrap();
    assert_eq!(applied(&conn), vec!["reorder", "schema"]);
    assert!(foreign_keys_enabled(&conn).unwrap());
}

#[test]
fn test_deferred_table_rebuild_recipe() {
    let mut conn = open();
    let migrations = vec![
        Migration::sql(
            "schema",
            "CREATE TABLE parent (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id));
             INSERT INTO parent VALUES (1, 'p');
             INSERT INTO child VALUES (1, 1);",
        ),
        Migration::sql(
            "rebuild_parent",
            "CREATE TABLE new_parent (id INTEGER PRIMARY KEY, name TEXT NOT NULL DEFAULT '');
             INSERT INTO new_parent SELECT id, COALESCE(name, '') FROM parent;
             DROP TABLE parent;
             ALTER TABLE new_parent RENAME TO parent;",
        ),
    ];
    run_all(&mut conn, &migrations).unwrap();
    assert_eq!(applied(&conn), vec!["rebuild_parent", "schema"]);
    assert!(foreign_key_violations(&conn).unwrap().is_empty());
}

// ── Disabled ───────────────────────────────────────────────────────────

#[test]
fn test_disabled_never_checks() {
    let mut conn = open();
    let migrations = vec![
        Migration::sql("schema", PARENT_CHILD),
        Migration::sql("orphan", "INSERT INTO child (id, parent_id) VALUES (1, 42)")
            .foreign_key_checks(ForeignKeyChecks::Disabled),
    ];
    run_all(&mut conn, &migrations).unwrap();
    assert_eq!(applied(&conn), vec!["orphan", "schema"]);
    assert_eq!(foreign_key_violations(&conn).unwrap().len(), 1);
    assert!(foreign_keys_enabled(&conn).unwrap());
}

#[test]
fn test_disabled_failure_restores_foreign_keys() {
    let mut conn = open();
    let migrations = vec![Migration::new("broken", |conn, _| {
        conn.execute_batch("THIS IS NOT SQL")?;
        Ok(())
    })
    .foreign_key_checks(ForeignKeyChecks::Disabled)];

    let err = run_all(&mut conn, &migrations).unwrap_err();
    assert!(matches!(err, MigrateError::Transform { .. }));
    assert!(foreign_keys_enabled(&conn).unwrap());
}

#[test]
fn test_transform_sees_disabled_enforcement() {
    let mut conn = open();
    let migrations = vec![Migration::new("inspect_pragma", |conn, _| {
        let enabled = foreign_keys_enabled(conn)?;
        if enabled {
            return Err("foreign keys should be off".into());
        }
        Ok(())
    })
    .foreign_key_checks(ForeignKeyChecks::Disabled)];
    run_all(&mut conn, &migrations).unwrap();
}

// ── Unenforced connections ─────────────────────────────────────────────

#[test]
fn test_unenforced_connection_degrades_to_immediate() {
    let mut conn = open_without_foreign_keys();
    let migrations = vec![
        Migration::sql("schema", PARENT_CHILD),
        Migration::sql("orphan", "INSERT INTO child (id, parent_id) VALUES (1, 42)")
            .foreign_key_checks(ForeignKeyChecks::Deferred),
    ];
    run_all(&mut conn, &migrations).unwrap();
    assert_eq!(applied(&conn), vec!["orphan", "schema"]);
    assert!(!foreign_keys_enabled(&conn).unwrap());
}

// ── Plan-level behavior ────────────────────────────────────────────────

#[test]
fn test_first_failure_halts_plan() {
    let mut conn = open();
    let migrations = vec![
        Migration::sql("v1", "CREATE TABLE one (a INT)"),
        Migration::new("v2", |_, _| Err("nope".into())),
        Migration::sql("v3", "CREATE TABLE three (a INT)"),
    ];
    let err = run_all(&mut conn, &migrations).unwrap_err();
    assert_eq!(err.migration_identifier(), Some("v2"));
    assert_eq!(applied(&conn), vec!["v1"]);
    assert!(table_exists(&conn, "one"));
    assert!(!table_exists(&conn, "three"));
}

#[test]
fn test_cleanup_removes_merged_rows() {
    let mut conn = open();
    for id in ["a", "b", "c"] {
        ledger::record(&conn, id).unwrap();
    }
    let migrations = vec![Migration::sql("c", "SELECT 1").merging(["a", "b"])];
    run_all(&mut conn, &migrations).unwrap();
    assert_eq!(applied(&conn), vec!["c"]);
}

#[test]
fn test_run_removes_applied_merged_rows() {
    let mut conn = open();
    for id in ["a", "b"] {
        ledger::record(&conn, id).unwrap();
    }
    let migrations = vec![Migration::sql("c", "CREATE TABLE t (a INT)").merging(["a", "b"])];
    run_all(&mut conn, &migrations).unwrap();
    assert_eq!(applied(&conn), vec!["c"]);
    assert!(table_exists(&conn, "t"));
}

#[test]
fn test_empty_plan_is_noop() {
    let mut conn = open();
    execute(&mut conn, &[]).unwrap();
    assert!(applied(&conn).is_empty());
}
