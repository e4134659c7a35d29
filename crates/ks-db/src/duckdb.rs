//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::registry::Connector;
use crate::traits::{Database, RowSet, Value};
use duckdb::Connection;
use std::path::Path;

/// DuckDB database backend.
pub struct DuckDbConnection {
    conn: Connection,
}

impl DuckDbConnection {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::Connection(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Create from a URL string (handles :memory: special case)
    pub fn open(url: &str) -> DbResult<Self> {
        if url == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(url))
        }
    }
}

/// Extract the ignorable error class from a DuckDB error message.
///
/// DuckDB has no SQLSTATE; messages lead with a class like
/// `Catalog Error: ...`, which becomes the code `CATALOG` (multi-word
/// classes join with underscores, e.g. `OUT_OF_RANGE`).
fn error_code(message: &str) -> Option<String> {
    let class = message.split_once(" Error:").map(|(class, _)| class.trim())?;
    if class.is_empty()
        || class.len() > 40
        || !class
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c == ' ')
    {
        return None;
    }
    Some(class.to_ascii_uppercase().replace(' ', "_"))
}

fn execution_error(e: &duckdb::Error) -> DbError {
    let message = e.to_string();
    DbError::Execution {
        code: error_code(&message),
        message,
    }
}

fn to_duckdb_params(params: &[Value]) -> Vec<duckdb::types::Value> {
    params
        .iter()
        .map(|p| match p {
            Value::Null => duckdb::types::Value::Null,
            Value::Text(s) => duckdb::types::Value::Text(s.clone()),
            Value::Int(n) => duckdb::types::Value::BigInt(*n),
        })
        .collect()
}

impl Database for DuckDbConnection {
    fn execute_with(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::Transaction(format!("BEGIN failed: {e}")))?;

        let result = self
            .conn
            .execute(sql, duckdb::params_from_iter(to_duckdb_params(params)));

        match result {
            Ok(affected) => {
                if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(DbError::Transaction(format!("COMMIT failed: {commit_err}")));
                }
                Ok(affected as u64)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(execution_error(&e))
            }
        }
    }

    fn relation_exists(&mut self, name: &str) -> DbResult<bool> {
        // Handle schema-qualified names
        let (schema, table) = if let Some(pos) = name.rfind('.') {
            (&name[..pos], &name[pos + 1..])
        } else {
            ("main", name)
        };

        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE lower(table_schema) = lower('{}') AND lower(table_name) = lower('{}')",
            schema, table
        );

        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(count > 0)
    }

    fn query_rows(&mut self, sql: &str) -> DbResult<RowSet> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| execution_error(&e))?;

        // DuckDB panics on column metadata before execution, so collect the
        // rows first and read the column names afterwards.
        let rows: Vec<Vec<Option<String>>> = stmt
            .query_map([], |row| {
                let count = row.as_ref().column_count();
                Ok((0..count).map(|i| column_as_string(row, i)).collect())
            })
            .map_err(|e| execution_error(&e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::Query(format!("row error: {e}")))?;

        let columns: Vec<String> = (0..stmt.column_count())
            .map(|i| stmt.column_name(i).map_or("?".to_string(), ToString::to_string))
            .collect();

        Ok(RowSet { columns, rows })
    }

    fn duplicate(&self) -> DbResult<Box<dyn Database>> {
        let conn = self
            .conn
            .try_clone()
            .map_err(|e| DbError::Connection(e.to_string()))?;
        Ok(Box::new(DuckDbConnection { conn }))
    }

    fn backend(&self) -> &'static str {
        "duckdb"
    }
}

/// Read a column value as a string, trying multiple DuckDB types.
fn column_as_string(row: &duckdb::Row<'_>, idx: usize) -> Option<String> {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return Some(s);
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return Some(n.to_string());
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return Some(f.to_string());
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return Some(b.to_string());
    }
    None
}

/// Opens DuckDB connections for the registry.
pub struct DuckDbConnector;

impl Connector for DuckDbConnector {
    fn connect(&self, url: &str) -> DbResult<Box<dyn Database>> {
        Ok(Box::new(DuckDbConnection::open(url)?))
    }
}
