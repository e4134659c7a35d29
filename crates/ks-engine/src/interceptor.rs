//! Command-interceptor capability.
//!
//! Interceptors are offered every persistent command, in registration order,
//! before default execution. The first one that reports [`Intercept::Handled`]
//! suppresses default execution. Custom command dialects (CSV loads, JSON
//! dumps, ...) plug in here without the processor knowing their syntax.

use ks_core::{Command, ProgressListener};
use ks_db::{Database, DbResult};

/// Whether an interceptor consumed the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intercept {
    Handled,
    NotHandled,
}

/// What an interceptor may touch while handling a command: the current
/// connection and the progress listener.
pub struct Session<'a> {
    pub db: &'a mut dyn Database,
    pub progress: &'a mut dyn ProgressListener,
}

/// One pluggable command handler in the ordered chain.
pub trait CommandInterceptor {
    /// Offered every persistent command. `skip` is true while a resumed run
    /// replays already-applied commands; a handler that consumes external
    /// data must still recognize the command to stay in sync, but must not
    /// execute its effect.
    fn try_handle(
        &mut self,
        session: &mut Session<'_>,
        command: &Command,
        skip: bool,
    ) -> DbResult<Intercept>;

    /// Called exactly once at run end, regardless of outcome.
    fn terminate(&mut self) {}
}
