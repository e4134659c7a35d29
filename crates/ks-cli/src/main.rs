//! Keystone CLI - resumable database upgrades from versioned upgrade files

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod config;
mod console;

use cli::Cli;
use commands::{audit, init, status, targets, upgrade};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        cli::Commands::Init(args) => init::execute(args),
        cli::Commands::Upgrade(args) => upgrade::execute(args, &cli.global),
        cli::Commands::Status(args) => status::execute(args, &cli.global),
        cli::Commands::Targets(args) => targets::execute(args, &cli.global),
        cli::Commands::Log(args) => audit::execute(args, &cli.global),
    }
}
