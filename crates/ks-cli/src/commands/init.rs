//! Init command implementation - scaffolds a new Keystone project

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::cli::InitArgs;

/// Execute the init command
pub(crate) fn execute(args: &InitArgs) -> Result<()> {
    // Reject names that could cause path traversal or confusing directory names
    if args.name.contains('/')
        || args.name.contains('\\')
        || args.name.contains("..")
        || args.name.starts_with('.')
        || args.name.starts_with('-')
    {
        anyhow::bail!(
            "Invalid project name '{}': must not contain '/', '\\', '..', or start with '.' or '-'",
            args.name
        );
    }

    let project_dir = Path::new(&args.name);
    if project_dir.exists() {
        anyhow::bail!(
            "Directory '{}' already exists. Choose a different project name.",
            args.name
        );
    }

    println!("Creating new Keystone project: {}\n", args.name);
    fs::create_dir_all(project_dir)
        .with_context(|| format!("Failed to create directory: {}", project_dir.display()))?;

    let safe_name = args.name.replace('"', "\\\"");
    let safe_db_path = args.database_path.replace('"', "\\\"");
    let config_content = format!(
        r#"name: "{safe_name}"
upgrade_file: "upgrade.sql"

databases:
  default:
    url: "{safe_db_path}"
    user: "admin"
"#
    );
    fs::write(project_dir.join("keystone.yml"), config_content)
        .context("Failed to write keystone.yml")?;

    let upgrade_content = r#"--* // Keystone upgrade file
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
--* SET MESSAGE "Creating the example table"
CREATE TABLE example ( id INTEGER, name VARCHAR );
--* /UPGRADE
"#;
    fs::write(project_dir.join("upgrade.sql"), upgrade_content)
        .context("Failed to write upgrade.sql")?;

    println!("  created keystone.yml");
    println!("  created upgrade.sql");
    println!("\nNext steps:");
    println!("  cd {}", args.name);
    println!("  ks upgrade \"1.0.2\"");
    Ok(())
}
