//! The command-processor state machine.
//!
//! Executes one command at a time: transient directives mutate the execution
//! context, persistent commands are offered to the interceptor chain and then
//! executed as a single statement in its own transaction. A database error
//! whose code is in the active ignore set is recovered locally; anything else
//! aborts the run.

use crate::context::ExecutionContext;
use crate::error::{EngineError, EngineResult};
use crate::interceptor::{CommandInterceptor, Intercept, Session};
use ks_core::{Command, Directive, ProgressListener};
use ks_db::{DatabaseRegistry, DbError, DbResult};

/// How many characters of a failing command are kept in the error message.
const ERROR_TEXT_LIMIT: usize = 200;

/// Result of executing one command.
#[derive(Debug)]
pub enum StepOutcome {
    /// A persistent command committed (by default execution or an
    /// interceptor).
    Executed,
    /// A persistent command failed with an ignored error code; the statement
    /// was rolled back and the run continues.
    Ignored(DbError),
    /// A persistent command was skipped during resumption.
    Skipped,
    /// A transient directive was applied.
    Transient,
}

/// Processes and executes commands, maintains the execution context, and
/// triggers the interceptors.
pub struct CommandProcessor {
    registry: DatabaseRegistry,
    interceptors: Vec<Box<dyn CommandInterceptor>>,
    progress: Box<dyn ProgressListener>,
    context: ExecutionContext,
}

impl CommandProcessor {
    pub fn new(registry: DatabaseRegistry, progress: Box<dyn ProgressListener>) -> Self {
        Self {
            registry,
            interceptors: Vec::new(),
            progress,
            context: ExecutionContext::new(),
        }
    }

    /// Append an interceptor to the chain; offer order is registration order.
    pub fn add_interceptor(&mut self, interceptor: Box<dyn CommandInterceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Reset the execution context and every registration's acting user.
    pub fn reset(&mut self) {
        self.context.reset();
        self.registry.reset_users();
    }

    pub fn registry(&mut self) -> &mut DatabaseRegistry {
        &mut self.registry
    }

    pub fn progress(&mut self) -> &mut dyn ProgressListener {
        self.progress.as_mut()
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Execute one command. `skip` suppresses the effect of a persistent
    /// command during resumption; transient commands are always applied.
    pub fn execute(&mut self, command: &Command, skip: bool) -> EngineResult<StepOutcome> {
        if command.is_persistent() {
            self.execute_persistent(command, skip)
        } else {
            self.execute_transient(command)
        }
    }

    fn execute_transient(&mut self, command: &Command) -> EngineResult<StepOutcome> {
        match Directive::parse(&command.text, command.line)? {
            Directive::IgnoreSqlError(codes) => self.context.push_ignores(codes),
            Directive::EndIgnoreSqlError => {
                if !self.context.pop_ignores() {
                    return Err(EngineError::UnbalancedIgnore { line: command.line });
                }
            }
            Directive::SetUser(user) => {
                let database = self.context.current_database().to_string();
                self.registry.get_mut(&database)?.set_current_user(&user);
            }
            Directive::SelectConnection(name) => {
                let canonical = self
                    .registry
                    .canonical_name(&name)
                    .ok_or(DbError::UnknownDatabase(name))?
                    .to_string();
                // Selecting a connection resets its acting user.
                self.registry.get_mut(&canonical)?.reset_user();
                self.context.select_database(canonical);
            }
            Directive::SetMessage(message) => self.context.set_start_message(message),
        }
        Ok(StepOutcome::Transient)
    }

    fn execute_persistent(&mut self, command: &Command, skip: bool) -> EngineResult<StepOutcome> {
        let message = self.context.take_start_message();
        self.progress.command_starting(command, message.as_deref());

        match self.run_persistent(command, skip) {
            Ok(outcome) => {
                self.progress.command_finished();
                Ok(outcome)
            }
            Err(error) => {
                if self.context.is_ignored(error.code()) {
                    // Rolled back by the statement executor; recovered here.
                    self.progress.status(&format!("Ignored SQL error: {error}"));
                    self.progress.command_finished();
                    Ok(StepOutcome::Ignored(error))
                } else {
                    let fatal = EngineError::Execution {
                        command: command.display_text(ERROR_TEXT_LIMIT).to_string(),
                        line: command.line,
                        message: error.to_string(),
                    };
                    self.progress.error(&fatal.to_string());
                    Err(fatal)
                }
            }
        }
    }

    fn run_persistent(&mut self, command: &Command, skip: bool) -> DbResult<StepOutcome> {
        let CommandProcessor {
            registry,
            interceptors,
            progress,
            context,
        } = self;

        let db = registry.connection(context.current_database())?;
        let mut session = Session {
            db,
            progress: progress.as_mut(),
        };

        for interceptor in interceptors.iter_mut() {
            if let Intercept::Handled = interceptor.try_handle(&mut session, command, skip)? {
                return Ok(if skip {
                    StepOutcome::Skipped
                } else {
                    StepOutcome::Executed
                });
            }
        }

        if skip {
            return Ok(StepOutcome::Skipped);
        }
        if command.text.trim().is_empty() {
            return Ok(StepOutcome::Executed);
        }

        session.db.execute(&command.text)?;
        Ok(StepOutcome::Executed)
    }

    /// Run teardown: terminate every interceptor and close every open
    /// connection, whatever the outcome was.
    pub fn end(&mut self) {
        for interceptor in &mut self.interceptors {
            interceptor.terminate();
        }
        self.registry.close_all();
    }
}

#[cfg(test)]
#[path = "processor_test.rs"]
mod tests;
