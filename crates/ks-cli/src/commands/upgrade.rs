//! Upgrade command implementation

use anyhow::Result;
use ks_core::TargetSpec;
use ks_engine::UpgradeOutcome;

use crate::cli::{GlobalArgs, UpgradeArgs};
use crate::commands::common::{build_runner, load_config};

/// Execute the upgrade command
pub(crate) fn execute(args: &UpgradeArgs, global: &GlobalArgs) -> Result<()> {
    let (config, project_dir) = load_config(global)?;
    let mut runner = build_runner(&config, &project_dir, global)?;

    let Some(target) = &args.target else {
        // No target spec: show the reachable frontier and let the user pick.
        let state = runner.read_state()?;
        let reachable = runner.reachable()?;
        runner.finish();

        match state.version {
            Some(version) => println!("Current version: \"{version}\""),
            None => println!("Current version: none (version tracking not initialized)"),
        }
        if reachable.is_empty() {
            println!("No versions are reachable from here.");
        } else {
            println!("Reachable versions:");
            for version in reachable {
                println!("  {version}");
            }
            println!("\nRun `ks upgrade <version>` to upgrade.");
        }
        return Ok(());
    };

    let spec = TargetSpec::parse(target);
    match runner.upgrade(&spec) {
        Ok(UpgradeOutcome::Upgraded { from, to, segments }) => {
            let from = from
                .map(|v| format!("\"{v}\""))
                .unwrap_or_else(|| "no version".to_string());
            println!(
                "\nUpgraded {from} to \"{to}\" ({segments} segment{})",
                if segments == 1 { "" } else { "s" }
            );
            Ok(())
        }
        Ok(UpgradeOutcome::AlreadyAtTarget { version }) => {
            println!("Nothing to do: already at version \"{version}\"");
            Ok(())
        }
        Err(e) => {
            log::debug!("upgrade failed: {e:?}");
            Err(e.into())
        }
    }
}
