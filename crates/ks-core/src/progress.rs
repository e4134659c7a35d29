//! Progress-reporting capability.
//!
//! The core never writes to a terminal; everything user-visible flows through
//! this listener. The CLI installs a console implementation, tests install a
//! recording one.

use crate::command::Command;

/// Callbacks for upgrade progress.
pub trait ProgressListener {
    /// A segment is about to run; `persistent` is its persistent command
    /// count (for progress bars).
    fn segment_starting(&mut self, target: &str, persistent: usize);

    /// A segment completed and the recorded version advanced.
    fn segment_finished(&mut self, target: &str);

    /// A persistent command is about to execute. `message` is the label set
    /// by the most recent SET MESSAGE directive, consumed by this command.
    fn command_starting(&mut self, command: &Command, message: Option<&str>);

    /// The command finished (committed, ignored, or skipped).
    fn command_finished(&mut self);

    /// A fatal error is about to abort the run.
    fn error(&mut self, message: &str);

    /// Free-form status line.
    fn status(&mut self, line: &str);
}

/// Listener that discards every event.
pub struct NullProgress;

impl ProgressListener for NullProgress {
    fn segment_starting(&mut self, _target: &str, _persistent: usize) {}
    fn segment_finished(&mut self, _target: &str) {}
    fn command_starting(&mut self, _command: &Command, _message: Option<&str>) {}
    fn command_finished(&mut self) {}
    fn error(&mut self, _message: &str) {}
    fn status(&mut self, _line: &str) {}
}
