//! CSV load interceptor.
//!
//! Handles `LOAD CSV INTO <table> FROM "<path>"` by inserting the file's rows
//! through the current connection's `read_csv_auto`.

use crate::interceptor::{CommandInterceptor, Intercept, Session};
use ks_core::token::{tokenize, TokenCursor};
use ks_core::Command;
use ks_db::{DbError, DbResult};

pub struct LoadCsv;

impl CommandInterceptor for LoadCsv {
    fn try_handle(
        &mut self,
        session: &mut Session<'_>,
        command: &Command,
        skip: bool,
    ) -> DbResult<Intercept> {
        let Some(tokens) = recognize(&command.text) else {
            return Ok(Intercept::NotHandled);
        };
        let (table, path) = tokens.ok_or_else(|| {
            DbError::Query(format!(
                "malformed LOAD CSV command at line {}: expected LOAD CSV INTO <table> FROM \"<path>\"",
                command.line
            ))
        })?;

        if skip {
            return Ok(Intercept::Handled);
        }

        session
            .progress
            .status(&format!("Loading CSV {path} into {table}"));
        let quoted = path.replace('\'', "''");
        session.db.execute(&format!(
            "INSERT INTO {table} SELECT * FROM read_csv_auto('{quoted}')"
        ))?;
        Ok(Intercept::Handled)
    }
}

/// `None` when the command is not a LOAD CSV at all; `Some(None)` when it is
/// but the tail is malformed.
type Recognized = Option<Option<(String, String)>>;

fn recognize(text: &str) -> Recognized {
    let tokens = tokenize(text, 0).ok()?;
    let mut cursor = TokenCursor::new(&tokens);
    cursor.take_keyword("LOAD")?;
    cursor.take_keyword("CSV")?;

    let parsed = (|| {
        cursor.take_keyword("INTO")?;
        let table = cursor.take_word()?;
        cursor.take_keyword("FROM")?;
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
    fn test_recognize_load_csv() {
        assert_eq!(
            recognize("LOAD CSV INTO users FROM \"seed/users.csv\""),
            Some(Some(("users".to_string(), "seed/users.csv".to_string())))
        );
    }

    #[test]
    fn test_other_commands_not_recognized() {
        assert_eq!(recognize("CREATE TABLE users ( id INTEGER )"), None);
        assert_eq!(recognize("LOAD DATA INTO users"), None);
    }

    #[test]
    fn test_malformed_tail_is_recognized_but_invalid() {
        assert_eq!(recognize("LOAD CSV users"), Some(None));
        assert_eq!(recognize("LOAD CSV INTO users FROM users.csv"), Some(None));
    }
}
