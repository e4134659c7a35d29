//! Targets command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, TargetsArgs};
use crate::commands::common::{build_runner, load_config};

/// Execute the targets command
pub(crate) fn execute(_args: &TargetsArgs, global: &GlobalArgs) -> Result<()> {
    let (config, project_dir) = load_config(global)?;
    let mut runner = build_runner(&config, &project_dir, global)?;

    let state = runner.read_state()?;
    let reachable = runner.reachable()?;
    runner.finish();

    match state.version {
        Some(version) => println!("Current version: \"{version}\""),
        None => println!("Current version: none"),
    }
    if reachable.is_empty() {
        println!("No reachable versions.");
    } else {
        for version in reachable {
            println!("  {version}");
        }
    }
    Ok(())
}
