use super::*;

fn write_config(dir: &std::path::Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("keystone.yml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"name: shop
upgrade_file: "schema/upgrade.sql"
databases:
  default:
    url: "db.duckdb"
    user: "owner"
  audit:
    url: "audit.duckdb"
"#,
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.name, "shop");
    assert_eq!(config.upgrade_file, "schema/upgrade.sql");
    assert_eq!(config.databases["default"].user, "owner");
    // User defaults when omitted.
    assert_eq!(config.databases["audit"].user, "admin");
}

#[test]
fn test_upgrade_file_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"name: shop
databases:
  default:
    url: ":memory:"
"#,
    );

    let config = Config::load(&path).unwrap();
    assert_eq!(config.upgrade_file, "upgrade.sql");
}

#[test]
fn test_missing_default_database_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"name: shop
databases:
  primary:
    url: "db.duckdb"
"#,
    );

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("default"));
}

#[test]
fn test_unknown_fields_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"name: shop
jdbc_driver: org.example.Driver
databases:
  default:
    url: "db.duckdb"
"#,
    );

    assert!(Config::load(&path).is_err());
}
