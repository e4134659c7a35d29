//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Keystone - resumable database upgrades from versioned upgrade files
#[derive(Parser, Debug)]
#[command(name = "ks")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold a new Keystone project
    Init(InitArgs),

    /// Upgrade the database to a target version
    Upgrade(UpgradeArgs),

    /// Show the recorded version state
    Status(StatusArgs),

    /// List versions reachable from the current version
    Targets(TargetsArgs),

    /// Show or export the upgrade audit log
    Log(LogArgs),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Name of the project directory to create
    pub name: String,

    /// Database file the scaffolded config points at
    #[arg(long, default_value = "db.duckdb")]
    pub database_path: String,
}

/// Arguments for the upgrade command
#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// Target version, or a wildcard prefix such as "1.0.*". Omitted:
    /// list the reachable versions instead of upgrading.
    pub target: Option<String>,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

/// Arguments for the targets command
#[derive(Args, Debug)]
pub struct TargetsArgs {}

/// Arguments for the log command
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Export the audit log as JSON to this file instead of printing it
    #[arg(long)]
    pub export: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
