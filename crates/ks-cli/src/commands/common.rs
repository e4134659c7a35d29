//! Shared helpers for subcommands: config discovery and runner wiring.

use anyhow::{Context, Result};
use ks_core::{FileLineSource, UpgradeFile};
use ks_db::{DatabaseRegistry, DuckDbConnection, DuckDbConnector};
use ks_engine::plugins::{DumpJson, LoadCsv};
use ks_engine::{CommandProcessor, UpgradeRunner};
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;
use crate::config::Config;
use crate::console::ConsoleProgress;

pub(crate) const CONFIG_FILE: &str = "keystone.yml";

/// Load the project config, honoring `--config` and `--project-dir`.
pub(crate) fn load_config(global: &GlobalArgs) -> Result<(Config, PathBuf)> {
    let project_dir = PathBuf::from(&global.project_dir);
    let config_path = match &global.config {
        Some(path) => PathBuf::from(path),
        None => project_dir.join(CONFIG_FILE),
    };
    let config = Config::load(&config_path)?;
    Ok((config, project_dir))
}

/// Resolve a database URL relative to the project directory.
fn resolve_url(project_dir: &Path, url: &str) -> String {
    if url == ":memory:" || Path::new(url).is_absolute() {
        url.to_string()
    } else {
        project_dir.join(url).display().to_string()
    }
}

/// Build the registry from the config's registrations.
pub(crate) fn build_registry(config: &Config, project_dir: &Path) -> DatabaseRegistry {
    let mut registry = DatabaseRegistry::new(Box::new(DuckDbConnector));
    for (name, entry) in &config.databases {
        registry.register(name, &resolve_url(project_dir, &entry.url), &entry.user);
    }
    registry
}

/// Scan the upgrade file and wire up a runner with the built-in plugins.
pub(crate) fn build_runner(
    config: &Config,
    project_dir: &Path,
    global: &GlobalArgs,
) -> Result<UpgradeRunner<FileLineSource>> {
    let upgrade_path = project_dir.join(&config.upgrade_file);
    let source = FileLineSource::open(&upgrade_path)?;
    let file = UpgradeFile::scan(source)
        .with_context(|| format!("failed to scan '{}'", upgrade_path.display()))?;

    let registry = build_registry(config, project_dir);
    let mut processor = CommandProcessor::new(
        registry,
        Box::new(ConsoleProgress::new(global.verbose)),
    );
    processor.add_interceptor(Box::new(LoadCsv));
    processor.add_interceptor(Box::new(DumpJson));

    Ok(UpgradeRunner::new(file, processor))
}

/// A direct connection to the default database (status/log inspection).
pub(crate) fn open_default(config: &Config, project_dir: &Path) -> Result<DuckDbConnection> {
    let entry = config
        .databases
        .get("default")
        .expect("config validation requires a default database");
    Ok(DuckDbConnection::open(&resolve_url(project_dir, &entry.url))?)
}
