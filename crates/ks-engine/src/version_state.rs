//! Durable version-state persistence.
//!
//! The tracking state lives in the target database itself: one upserted row
//! in `ks_version` plus an append-only audit log in `ks_version_log`. The
//! engine never creates these tables — the INIT segment's own SQL must — so
//! `read` has to tolerate their absence. Every write here commits in its own
//! statement-level transaction, independent of the business statement that
//! triggered it, which is what makes a checkpoint survive a later rollback.

use crate::error::{EngineError, EngineResult};
use chrono::Utc;
use ks_db::{Database, Value};

/// Table holding the single version row: (version, target, statements).
pub const VERSION_TABLE: &str = "ks_version";

/// Append-only audit log table:
/// (source, target, statement, stamp, command, result).
pub const LOG_TABLE: &str = "ks_version_log";

/// Command and result text are clipped before logging; generous enough for
/// diagnostics, small enough for any backend's VARCHAR limits.
const LOG_TEXT_LIMIT: usize = 3000;

/// The persisted version state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionState {
    /// `None` means the tracking state does not exist yet.
    pub version: Option<String>,
    /// Non-`None` signals an incomplete upgrade toward this version.
    pub target: Option<String>,
    /// Ordinal of the last committed persistent command within the current
    /// target segment.
    pub statements: i64,
}

/// Reads and writes the version row and the audit log.
pub struct VersionStore {
    state: VersionState,
    version_table_exists: bool,
    row_exists: bool,
    log_table_exists: bool,
    log_skip_noted: bool,
}

impl VersionStore {
    /// Probe the tracking tables and read the recorded state. Idempotent and
    /// tolerant of the tables not existing yet.
    pub fn read(db: &mut dyn Database) -> EngineResult<Self> {
        let version_table_exists = db.relation_exists(VERSION_TABLE)?;
        let log_table_exists = db.relation_exists(LOG_TABLE)?;

        let mut state = VersionState::default();
        let mut row_exists = false;
        if version_table_exists {
            let rows = db.query_rows(&format!(
                "SELECT version, target, statements FROM {VERSION_TABLE}"
            ))?;
            if rows.rows.len() > 1 {
                return Err(EngineError::State(format!(
                    "expected a single row in {VERSION_TABLE}, found {}",
                    rows.rows.len()
                )));
            }
            if let Some(row) = rows.rows.first() {
                state = VersionState {
                    version: row.first().cloned().flatten(),
                    target: row.get(1).cloned().flatten(),
                    statements: parse_statements(row.get(2).cloned().flatten())?,
                };
                row_exists = true;
            }
        }

        log::debug!(
            "version={:?} target={:?} statements={}",
            state.version,
            state.target,
            state.statements
        );

        Ok(Self {
            state,
            version_table_exists,
            row_exists,
            log_table_exists,
            log_skip_noted: false,
        })
    }

    pub fn state(&self) -> &VersionState {
        &self.state
    }

    /// Persist {target, statements} after a committed persistent command.
    pub fn set_progress(
        &mut self,
        db: &mut dyn Database,
        target: &str,
        statements: i64,
    ) -> EngineResult<()> {
        if !self.version_table_exists {
            // The INIT segment is expected to have created the table by now.
            if !db.relation_exists(VERSION_TABLE)? {
                return Err(EngineError::State(format!(
                    "table {VERSION_TABLE} does not exist; the INIT block must create it"
                )));
            }
            self.version_table_exists = true;
        }

        if self.row_exists {
            let updated = db.execute_with(
                &format!("UPDATE {VERSION_TABLE} SET target = ?, statements = ?"),
                &[Value::Text(target.to_string()), Value::Int(statements)],
            )?;
            if updated != 1 {
                return Err(EngineError::State(format!(
                    "expected 1 row of {VERSION_TABLE} to be updated, not {updated}"
                )));
            }
        } else {
            db.execute_with(
                &format!(
                    "INSERT INTO {VERSION_TABLE} ( version, target, statements ) VALUES ( ?, ?, ? )"
                ),
                &[
                    Value::Null,
                    Value::Text(target.to_string()),
                    Value::Int(statements),
                ],
            )?;
            self.row_exists = true;
        }

        self.state.target = Some(target.to_string());
        self.state.statements = statements;
        Ok(())
    }

    /// A segment completed: advance the version and clear target/counter in
    /// one statement.
    pub fn set_version(&mut self, db: &mut dyn Database, version: &str) -> EngineResult<()> {
        if self.row_exists {
            let updated = db.execute_with(
                &format!(
                    "UPDATE {VERSION_TABLE} SET version = ?, target = NULL, statements = 0"
                ),
                &[Value::Text(version.to_string())],
            )?;
            if updated != 1 {
                return Err(EngineError::State(format!(
                    "expected 1 row of {VERSION_TABLE} to be updated, not {updated}"
                )));
            }
        } else {
            // A segment with no persistent commands completed before any
            // progress write.
            db.execute_with(
                &format!(
                    "INSERT INTO {VERSION_TABLE} ( version, target, statements ) VALUES ( ?, NULL, 0 )"
                ),
                &[Value::Text(version.to_string())],
            )?;
            self.row_exists = true;
        }

        self.state.version = Some(version.to_string());
        self.state.target = None;
        self.state.statements = 0;
        Ok(())
    }

    /// Append an audit-log record. Best-effort: skipped when the log table
    /// does not exist (noted once per run at debug level), and a failed
    /// write never aborts the run.
    pub fn log(
        &mut self,
        db: &mut dyn Database,
        source: Option<&str>,
        target: &str,
        statement: Option<i64>,
        command: Option<&str>,
        result: Option<&str>,
    ) {
        if !self.log_table_exists {
            if !self.log_skip_noted {
                log::debug!("{LOG_TABLE} does not exist; skipping audit log writes");
                self.log_skip_noted = true;
            }
            return;
        }

        let outcome = db.execute_with(
            &format!(
                "INSERT INTO {LOG_TABLE} ( source, target, statement, stamp, command, result ) \
                 VALUES ( ?, ?, ?, ?, ?, ? )"
            ),
            &[
                text_or_null(source),
                Value::Text(target.to_string()),
                statement.map_or(Value::Null, Value::Int),
                Value::Text(Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
                text_or_null(command.map(|c| clip(c, LOG_TEXT_LIMIT))),
                text_or_null(result.map(|r| clip(r, LOG_TEXT_LIMIT))),
            ],
        );
        if let Err(e) = outcome {
            log::warn!("audit log write failed: {e}");
        }
    }

    /// Record the completion of a version in the audit log.
    pub fn log_completed(&mut self, db: &mut dyn Database, source: Option<&str>, version: &str) {
        self.log(
            db,
            source,
            version,
            None,
            None,
            Some(&format!("COMPLETED VERSION {version}")),
        );
    }
}

fn parse_statements(cell: Option<String>) -> EngineResult<i64> {
    match cell {
        None => Ok(0),
        Some(text) => text.parse().map_err(|_| {
            EngineError::State(format!("invalid statements counter '{text}' in {VERSION_TABLE}"))
        }),
    }
}

fn text_or_null(text: Option<&str>) -> Value {
    match text {
        Some(t) => Value::Text(t.to_string()),
        None => Value::Null,
    }
}

/// First `max` characters, split on a char boundary.
fn clip(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

#[cfg(test)]
#[path = "version_state_test.rs"]
mod tests;
