//! Status command implementation

use anyhow::Result;
use ks_engine::VersionStore;

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{load_config, open_default};

/// Execute the status command
pub(crate) fn execute(_args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let (config, project_dir) = load_config(global)?;
    let mut db = open_default(&config, &project_dir)?;
    let state = VersionStore::read(&mut db)?.state().clone();

    match &state.version {
        Some(version) => println!("Current version:  \"{version}\""),
        None => println!("Current version:  none (version tracking not initialized)"),
    }
    match &state.target {
        Some(target) => {
            println!("In progress:      upgrade to \"{target}\"");
            println!("Statements done:  {}", state.statements);
            println!("\nRe-run `ks upgrade \"{target}\"` to resume.");
        }
        None => println!("In progress:      no"),
    }
    Ok(())
}
