//! Configuration types and parsing for keystone.yml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main project configuration from keystone.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Upgrade file, relative to the project directory
    #[serde(default = "default_upgrade_file")]
    pub upgrade_file: String,

    /// Named database registrations. The entry named `default` is the
    /// initial current database and holds the version-tracking state.
    pub databases: BTreeMap<String, DatabaseEntry>,
}

/// One named database registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseEntry {
    /// DuckDB database path, or ":memory:"
    pub url: String,

    /// Default user of this registration
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_upgrade_file() -> String {
    "upgrade.sql".to_string()
}

fn default_user() -> String {
    "admin".to_string()
}

impl Config {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse '{}'", path.display()))?;

        if !config.databases.contains_key("default") {
            anyhow::bail!(
                "'{}' must register a database named 'default'",
                path.display()
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
