//! Error types for ks-engine

use ks_core::CoreError;
use ks_db::DbError;
use thiserror::Error;

/// Engine error type.
///
/// Every variant is fatal: it unwinds to the top of the run, connections are
/// closed, and nothing is retried automatically. Recoverable (ignored)
/// database errors never become an `EngineError`.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Structure, resolution, or directive error from the upgrade file.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Database error outside statement execution (state reads, progress
    /// writes, connection handling).
    #[error(transparent)]
    Db(#[from] DbError),

    /// K001: A persistent command failed and its code was not in the active
    /// ignore set. Prior committed progress remains valid and resumable.
    #[error("[K001] SQL error at line {line}: {message}\n  while executing: {command}")]
    Execution {
        command: String,
        line: usize,
        message: String,
    },

    /// K002: The version-tracking state is missing or inconsistent.
    #[error("[K002] Version state error: {0}")]
    State(String),

    /// K003: /IGNORE SQL ERROR with an empty ignore stack.
    #[error("[K003] /IGNORE SQL ERROR at line {line} has no matching IGNORE SQL ERROR")]
    UnbalancedIgnore { line: usize },
}

/// Result type alias for [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;
