//! Run orchestration: read the recorded state, resolve the path, and walk it
//! segment by segment with durable checkpoints.

use crate::error::EngineResult;
use crate::processor::{CommandProcessor, StepOutcome};
use crate::version_state::{VersionState, VersionStore};
use ks_core::resolver::{self, Resolution, TargetSpec};
use ks_core::{LineSource, SegmentKind, UpgradeFile};

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Upgraded {
        from: Option<String>,
        to: String,
        segments: usize,
    },
    AlreadyAtTarget {
        version: String,
    },
}

/// Drives one upgrade run over a scanned upgrade file.
pub struct UpgradeRunner<S: LineSource> {
    file: UpgradeFile<S>,
    processor: CommandProcessor,
}

impl<S: LineSource> UpgradeRunner<S> {
    pub fn new(file: UpgradeFile<S>, processor: CommandProcessor) -> Self {
        Self { file, processor }
    }

    /// The recorded version state of the default database.
    pub fn read_state(&mut self) -> EngineResult<VersionState> {
        let db = self.processor.registry().default_connection()?;
        Ok(VersionStore::read(db)?.state().clone())
    }

    /// Versions reachable from the current version, for prompting when no
    /// target spec was given.
    pub fn reachable(&mut self) -> EngineResult<Vec<String>> {
        let state = self.read_state()?;
        Ok(resolver::reachable_versions(
            self.file.graph(),
            state.version.as_deref(),
        ))
    }

    /// Release connections and interceptors without running an upgrade.
    pub fn finish(&mut self) {
        self.processor.end();
    }

    /// Resolve the target spec and execute the resulting path. Connections
    /// and interceptors are released whatever the outcome.
    pub fn upgrade(&mut self, spec: &TargetSpec) -> EngineResult<UpgradeOutcome> {
        let result = self.run(spec);
        self.processor.end();
        result
    }

    fn run(&mut self, spec: &TargetSpec) -> EngineResult<UpgradeOutcome> {
        self.processor.reset();

        let mut store = {
            let db = self.processor.registry().default_connection()?;
            VersionStore::read(db)?
        };
        let from = store.state().version.clone();

        let path = match resolver::resolve(self.file.graph(), from.as_deref(), spec)? {
            Resolution::AlreadyAtTarget(version) => {
                self.processor
                    .progress()
                    .status(&format!("Database is already at version \"{version}\""));
                return Ok(UpgradeOutcome::AlreadyAtTarget { version });
            }
            Resolution::Path(path) => path,
        };

        let segments = path.len();
        for index in path {
            self.run_segment(&mut store, index)?;
        }

        let to = store
            .state()
            .version
            .clone()
            .expect("version is recorded after a completed path");
        self.processor
            .progress()
            .status(&format!("Upgrade complete: database is now at version \"{to}\""));
        Ok(UpgradeOutcome::Upgraded { from, to, segments })
    }

    fn run_segment(&mut self, store: &mut VersionStore, index: usize) -> EngineResult<()> {
        let (source, target, kind) = {
            let segment = self.file.graph().segment(index);
            (
                segment.source.clone(),
                segment.target.clone(),
                segment.kind,
            )
        };
        let commands = self.file.read_commands(index)?;
        let persistent_total = commands.iter().filter(|c| c.is_persistent()).count();

        let banner = match kind {
            SegmentKind::Init => {
                format!("Initializing version tracking at \"{target}\"")
            }
            SegmentKind::Upgrade => format!(
                "Upgrading \"{}\" to \"{target}\"",
                source.as_deref().unwrap_or("")
            ),
        };
        self.processor.progress().status(&banner);
        self.processor
            .progress()
            .segment_starting(&target, persistent_total);

        // Resume: the persisted counter tells how many persistent commands of
        // this segment already committed. Transient commands are always
        // re-applied so the context is rebuilt.
        let skip = if store.state().target.as_deref() == Some(target.as_str()) {
            store.state().statements
        } else {
            0
        };
        if skip > 0 {
            self.processor.progress().status(&format!(
                "Resuming: skipping {skip} already applied statement(s)"
            ));
        }

        let mut ordinal: i64 = 0;
        for command in &commands {
            let mut skip_this = false;
            if command.is_persistent() {
                ordinal += 1;
                skip_this = ordinal <= skip;
            }

            match self.processor.execute(command, skip_this) {
                Ok(StepOutcome::Executed) if command.is_persistent() => {
                    let db = self.processor.registry().default_connection()?;
                    store.set_progress(db, &target, ordinal)?;
                    store.log(
                        db,
                        source.as_deref(),
                        &target,
                        Some(ordinal),
                        Some(&command.text),
                        None,
                    );
                }
                Ok(StepOutcome::Ignored(error)) => {
                    let db = self.processor.registry().default_connection()?;
                    store.log(
                        db,
                        source.as_deref(),
                        &target,
                        Some(ordinal),
                        Some(&command.text),
                        Some(&error.to_string()),
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    if let Ok(db) = self.processor.registry().default_connection() {
                        store.log(
                            db,
                            source.as_deref(),
                            &target,
                            Some(ordinal),
                            Some(&command.text),
                            Some(&error.to_string()),
                        );
                    }
                    return Err(error);
                }
            }
        }

        let db = self.processor.registry().default_connection()?;
        store.set_version(db, &target)?;
        store.log_completed(db, source.as_deref(), &target);
        self.processor.progress().segment_finished(&target);
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
