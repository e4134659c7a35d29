//! Error types for ks-db

use thiserror::Error;

/// Database layer errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// D001: Failed to open a connection
    #[error("[D001] Connection failed: {0}")]
    Connection(String),

    /// D002: Statement execution failed. `code` is the backend error class
    /// matched against IGNORE SQL ERROR sets.
    #[error("[D002] {message}")]
    Execution {
        code: Option<String>,
        message: String,
    },

    /// D003: Transaction control failed
    #[error("[D003] Transaction failed: {0}")]
    Transaction(String),

    /// D004: Query failed or returned an unexpected shape
    #[error("[D004] Query failed: {0}")]
    Query(String),

    /// D005: Database name not registered
    #[error("[D005] Database '{0}' (case-insensitive) is not registered")]
    UnknownDatabase(String),
}

impl DbError {
    /// The error code checked against the active ignore set, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            DbError::Execution { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for [`DbError`].
pub type DbResult<T> = Result<T, DbError>;
