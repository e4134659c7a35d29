//! End-to-end upgrade tests against a real DuckDB database.

use ks_core::resolver::TargetSpec;
use ks_core::{FileLineSource, NullProgress, UpgradeFile};
use ks_db::{Database, DatabaseRegistry, DuckDbConnection, DuckDbConnector};
use ks_engine::plugins::{DumpJson, LoadCsv};
use ks_engine::{CommandProcessor, UpgradeOutcome, UpgradeRunner};
use std::path::Path;

const UPGRADE_FILE: &str = r#"--* // Keystone upgrade file
--* DEFINITION
--*     INIT "" --> "1.0.1"
--*     UPGRADE "1.0.1" --> "1.0.2"
--* /DEFINITION

--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
CREATE TABLE ks_version_log (
    source VARCHAR,
    target VARCHAR,
    statement BIGINT,
    stamp TIMESTAMP,
    command VARCHAR,
    result VARCHAR
);
--* /INIT

--* UPGRADE "1.0.1" --> "1.0.2"
--* SET MESSAGE "Creating the users table"
CREATE TABLE users ( id INTEGER, name VARCHAR );
INSERT INTO users VALUES ( 1, 'ada' );
--* IGNORE SQL ERROR CATALOG
DROP TABLE obsolete;
--* /IGNORE SQL ERROR
INSERT INTO users VALUES ( 2, 'grace' );
--* /UPGRADE
"#;

fn write_upgrade_file(dir: &Path, text: &str) -> std::path::PathBuf {
    let path = dir.join("upgrade.sql");
    std::fs::write(&path, text).unwrap();
    path
}

fn runner(dir: &Path, text: &str) -> UpgradeRunner<FileLineSource> {
    let upgrade_path = write_upgrade_file(dir, text);
    let file = UpgradeFile::scan(FileLineSource::open(&upgrade_path).unwrap()).unwrap();

    let mut registry = DatabaseRegistry::new(Box::new(DuckDbConnector));
    registry.register(
        "default",
        dir.join("db.duckdb").to_str().unwrap(),
        "admin",
    );

    let mut processor = CommandProcessor::new(registry, Box::new(NullProgress));
    processor.add_interceptor(Box::new(LoadCsv));
    processor.add_interceptor(Box::new(DumpJson));
    UpgradeRunner::new(file, processor)
}

fn query(dir: &Path, sql: &str) -> Vec<Vec<Option<String>>> {
    let mut db = DuckDbConnection::open(dir.join("db.duckdb").to_str().unwrap()).unwrap();
    db.query_rows(sql).unwrap().rows
}

#[test]
fn test_full_upgrade_and_idempotent_rerun() {
    let dir = tempfile::tempdir().unwrap();

    let outcome = runner(dir.path(), UPGRADE_FILE)
        .upgrade(&TargetSpec::Exact("1.0.2".to_string()))
        .unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::Upgraded {
            from: None,
            to: "1.0.2".to_string(),
            segments: 2,
        }
    );

    let state = query(dir.path(), "SELECT version, target, statements FROM ks_version");
    assert_eq!(state[0][0].as_deref(), Some("1.0.2"));
    assert_eq!(state[0][1], None);
    assert_eq!(state[0][2].as_deref(), Some("0"));

    // The ignored DROP appears in the log with its error; completed versions
    // are recorded too.
    let log = query(
        dir.path(),
        "SELECT result FROM ks_version_log WHERE result IS NOT NULL ORDER BY stamp",
    );
    assert!(log
        .iter()
        .any(|row| row[0].as_deref().is_some_and(|r| r.contains("Catalog"))));
    assert!(log
        .iter()
        .any(|row| row[0].as_deref() == Some("COMPLETED VERSION 1.0.2")));

    let users = query(dir.path(), "SELECT COUNT(*) FROM users");
    assert_eq!(users[0][0].as_deref(), Some("2"));

    // Re-running with the target already reached executes nothing.
    let outcome = runner(dir.path(), UPGRADE_FILE)
        .upgrade(&TargetSpec::Exact("1.0.2".to_string()))
        .unwrap();
    assert_eq!(
        outcome,
        UpgradeOutcome::AlreadyAtTarget {
            version: "1.0.2".to_string()
        }
    );
    let users = query(dir.path(), "SELECT COUNT(*) FROM users");
    assert_eq!(users[0][0].as_deref(), Some("2"));
}

#[test]
fn test_abort_then_resume_skips_committed_statements() {
    let dir = tempfile::tempdir().unwrap();
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--*     UPGRADE "1.0.1" --> "1.0.2"
--* /DEFINITION
--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
--* /INIT
--* UPGRADE "1.0.1" --> "1.0.2"
CREATE TABLE events ( id INTEGER );
INSERT INTO waiting_room SELECT 1;
--* /UPGRADE
"#;

    // First run: the second statement of the 1.0.1 -> 1.0.2 segment fails.
    let err = runner(dir.path(), text)
        .upgrade(&TargetSpec::Exact("1.0.2".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("waiting_room"));

    let state = query(dir.path(), "SELECT version, target, statements FROM ks_version");
    assert_eq!(state[0][0].as_deref(), Some("1.0.1"));
    assert_eq!(state[0][1].as_deref(), Some("1.0.2"));
    assert_eq!(state[0][2].as_deref(), Some("1"));

    // Repair the missing table out of band, then re-run with identical
    // inputs. The committed CREATE TABLE is skipped — re-executing it would
    // fail — and the run completes.
    {
        let mut db =
            DuckDbConnection::open(dir.path().join("db.duckdb").to_str().unwrap()).unwrap();
        db.execute("CREATE TABLE waiting_room ( id INTEGER )").unwrap();
    }

    let outcome = runner(dir.path(), text)
        .upgrade(&TargetSpec::Exact("1.0.2".to_string()))
        .unwrap();
    assert!(matches!(outcome, UpgradeOutcome::Upgraded { .. }));

    let state = query(dir.path(), "SELECT version, target, statements FROM ks_version");
    assert_eq!(state[0][0].as_deref(), Some("1.0.2"));
    assert_eq!(state[0][1], None);

    let events = query(dir.path(), "SELECT COUNT(*) FROM events");
    assert_eq!(events[0][0].as_deref(), Some("1"));
}

#[test]
fn test_set_user_uses_separate_connection() {
    let dir = tempfile::tempdir().unwrap();
    let text = r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--* /DEFINITION
--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
--* SET USER batch
CREATE TABLE loaded_by_batch ( id INTEGER );
--* /INIT
"#;

    runner(dir.path(), text)
        .upgrade(&TargetSpec::Exact("1.0.1".to_string()))
        .unwrap();

    // Both connections addressed the same database.
    let state = query(dir.path(), "SELECT version FROM ks_version");
    assert_eq!(state[0][0].as_deref(), Some("1.0.1"));
    let rows = query(dir.path(), "SELECT COUNT(*) FROM loaded_by_batch");
    assert_eq!(rows[0][0].as_deref(), Some("0"));
}

#[test]
fn test_load_csv_plugin_intercepts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("pets.csv"), "id,name\n1,rex\n2,milo\n").unwrap();
    let csv_path = dir.path().join("pets.csv");
    let text = format!(
        r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--* /DEFINITION
--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
CREATE TABLE pets ( id INTEGER, name VARCHAR );
LOAD CSV INTO pets FROM "{}";
--* /INIT
"#,
        csv_path.display()
    );

    runner(dir.path(), &text)
        .upgrade(&TargetSpec::Exact("1.0.1".to_string()))
        .unwrap();

    let rows = query(dir.path(), "SELECT COUNT(*) FROM pets");
    assert_eq!(rows[0][0].as_deref(), Some("2"));
}

#[test]
fn test_dump_json_plugin_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("pets.json");
    let text = format!(
        r#"--* DEFINITION
--*     INIT "" --> "1.0.1"
--* /DEFINITION
--* INIT "" --> "1.0.1"
CREATE TABLE ks_version ( version VARCHAR, target VARCHAR, statements BIGINT );
CREATE TABLE pets ( id INTEGER, name VARCHAR );
INSERT INTO pets VALUES ( 1, 'rex' );
DUMP JSON TABLE pets TO "{}";
--* /INIT
"#,
        out_path.display()
    );

    runner(dir.path(), &text)
        .upgrade(&TargetSpec::Exact("1.0.1".to_string()))
        .unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out_path).unwrap()).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["name"], "rex");
}
