//! JSON dump interceptor.
//!
//! Handles `DUMP JSON TABLE <table> TO "<path>"` by writing the table's rows
//! as a JSON array of objects.

use crate::interceptor::{CommandInterceptor, Intercept, Session};
use ks_core::token::{tokenize, TokenCursor};
use ks_core::Command;
use ks_db::{DbError, DbResult};
use serde_json::{Map, Value};

pub struct DumpJson;

impl CommandInterceptor for DumpJson {
    fn try_handle(
        &mut self,
        session: &mut Session<'_>,
        command: &Command,
        skip: bool,
    ) -> DbResult<Intercept> {
        let Some(parsed) = recognize(&command.text) else {
            return Ok(Intercept::NotHandled);
        };
        let (table, path) = parsed.ok_or_else(|| {
            DbError::Query(format!(
                "malformed DUMP JSON command at line {}: expected DUMP JSON TABLE <table> TO \"<path>\"",
                command.line
            ))
        })?;

        if skip {
            return Ok(Intercept::Handled);
        }

        session
            .progress
            .status(&format!("Dumping {table} to {path}"));

        let rows = session.db.query_rows(&format!("SELECT * FROM {table}"))?;
        let records: Vec<Value> = rows
            .rows
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (column, cell) in rows.columns.iter().zip(row) {
                    let value = match cell {
                        Some(text) => Value::String(text.clone()),
                        None => Value::Null,
                    };
                    record.insert(column.clone(), value);
                }
                Value::Object(record)
            })
            .collect();

        let json = serde_json::to_string_pretty(&Value::Array(records))
            .map_err(|e| DbError::Query(format!("JSON encoding failed: {e}")))?;
        std::fs::write(&path, json)
            .map_err(|e| DbError::Query(format!("failed to write '{path}': {e}")))?;
        Ok(Intercept::Handled)
    }
}

fn recognize(text: &str) -> Option<Option<(String, String)>> {
    let tokens = tokenize(text, 0).ok()?;
    let mut cursor = TokenCursor::new(&tokens);
    cursor.take_keyword("DUMP")?;
    cursor.take_keyword("JSON")?;

    let parsed = (|| {
        cursor.take_keyword("TABLE")?;
        let table = cursor.take_word()?;
        cursor.take_keyword("TO")?;
        let path = cursor.take_quoted()?;
        cursor.take_end()?;
        Some((table, path))
    })();
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognize_dump_json() {
        assert_eq!(
            recognize("DUMP JSON TABLE users TO \"out/users.json\""),
            Some(Some(("users".to_string(), "out/users.json".to_string())))
        );
        assert_eq!(recognize("SELECT 1"), None);
        assert_eq!(recognize("DUMP JSON everything"), Some(None));
    }
}
