//! Database trait definition

use crate::error::DbResult;

/// Parameter value for bound statement execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
}

/// Query result: column names plus rows of nullable string cells.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// One connection the engine can execute against.
///
/// The engine is a single logical thread of control, so the trait is
/// synchronous and implementations need no interior locking. Every statement
/// runs inside an explicit transaction — autocommit is never relied on — and
/// the connection is released (committed or rolled back) at every statement
/// boundary.
pub trait Database {
    /// Execute one statement inside an explicit transaction: commit on
    /// success, roll back on error. Returns affected rows.
    fn execute(&mut self, sql: &str) -> DbResult<u64> {
        self.execute_with(sql, &[])
    }

    /// [`Database::execute`] with bound parameters.
    fn execute_with(&mut self, sql: &str, params: &[Value]) -> DbResult<u64>;

    /// Check whether a table or view exists.
    fn relation_exists(&mut self, name: &str) -> DbResult<bool>;

    /// Run a query and collect all rows.
    fn query_rows(&mut self, sql: &str) -> DbResult<RowSet>;

    /// A second connection to the same underlying database, used for
    /// per-user sub-connections of one registration.
    fn duplicate(&self) -> DbResult<Box<dyn Database>>;

    /// Backend identifier for logging.
    fn backend(&self) -> &'static str;
}
