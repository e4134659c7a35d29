//! Shared test doubles: a scriptable in-memory database and a recording
//! progress listener. These let the processor state machine run without a
//! live database.

use ks_core::{Command, ProgressListener, StringLineSource, UpgradeFile};
use ks_db::{Connector, Database, DatabaseRegistry, DbError, DbResult, RowSet, Value};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// One recorded statement execution.
#[derive(Debug, Clone)]
pub struct ExecRecord {
    /// Id of the connection the statement ran through.
    pub conn: usize,
    pub sql: String,
    pub params: Vec<Value>,
    pub ok: bool,
}

/// Shared state behind every mock connection of a registry.
#[derive(Default)]
pub struct MockState {
    next_conn: usize,
    pub executed: Vec<ExecRecord>,
    /// (sql substring, error code) pairs that force a failure.
    pub fail_on: Vec<(String, String)>,
    pub relations: HashSet<String>,
    /// The single ks_version row, if present.
    pub version_row: Option<(Option<String>, Option<String>, i64)>,
    /// Connections dropped so far (close_all releases them).
    pub closed: usize,
}

impl MockState {
    /// SQL of successfully executed statements.
    pub fn statements(&self) -> Vec<String> {
        self.executed
            .iter()
            .filter(|r| r.ok)
            .map(|r| r.sql.clone())
            .collect()
    }

    pub fn record_for(&self, sql_fragment: &str) -> Option<ExecRecord> {
        self.executed
            .iter()
            .find(|r| r.sql.contains(sql_fragment))
            .cloned()
    }
}

pub struct MockDb {
    pub id: usize,
    shared: Rc<RefCell<MockState>>,
}

impl Drop for MockDb {
    fn drop(&mut self) {
        self.shared.borrow_mut().closed += 1;
    }
}

impl MockDb {
    fn apply(&self, sql: &str, params: &[Value]) {
        let mut state = self.shared.borrow_mut();
        let upper = sql.trim().to_ascii_uppercase();
        if let Some(rest) = upper.strip_prefix("CREATE TABLE") {
            if let Some(name) = rest.split_whitespace().next() {
                let name = name.trim_matches('(').to_ascii_lowercase();
                state.relations.insert(name);
            }
        } else if sql.starts_with("INSERT INTO ks_version (") {
            let version = text_param(params.first());
            let target = text_param(params.get(1));
            let statements = int_param(params.get(2));
            state.version_row = Some((version, target, statements));
        } else if sql.starts_with("UPDATE ks_version SET target = ?") {
            if let Some(row) = state.version_row.as_mut() {
                row.1 = text_param(params.first());
                row.2 = int_param(params.get(1));
            }
        } else if sql.starts_with("UPDATE ks_version SET version = ?") {
            if let Some(row) = state.version_row.as_mut() {
                row.0 = text_param(params.first());
                row.1 = None;
                row.2 = 0;
            }
        }
    }
}

fn text_param(param: Option<&Value>) -> Option<String> {
    match param {
        Some(Value::Text(t)) => Some(t.clone()),
        _ => None,
    }
}

fn int_param(param: Option<&Value>) -> i64 {
    match param {
        Some(Value::Int(n)) => *n,
        _ => 0,
    }
}

impl Database for MockDb {
    fn execute_with(&mut self, sql: &str, params: &[Value]) -> DbResult<u64> {
        let failure = {
            let state = self.shared.borrow();
            state
                .fail_on
                .iter()
                .find(|(fragment, _)| sql.contains(fragment.as_str()))
                .map(|(_, code)| code.clone())
        };

        if let Some(code) = failure {
            self.shared.borrow_mut().executed.push(ExecRecord {
                conn: self.id,
                sql: sql.to_string(),
                params: params.to_vec(),
                ok: false,
            });
            return Err(DbError::Execution {
                code: Some(code),
                message: format!("forced failure: {sql}"),
            });
        }

        self.apply(sql, params);
        let affected = if sql.starts_with("UPDATE ks_version") {
            u64::from(self.shared.borrow().version_row.is_some())
        } else {
            1
        };
        self.shared.borrow_mut().executed.push(ExecRecord {
            conn: self.id,
            sql: sql.to_string(),
            params: params.to_vec(),
            ok: true,
        });
        Ok(affected)
    }

    fn relation_exists(&mut self, name: &str) -> DbResult<bool> {
        Ok(self.shared.borrow().relations.contains(name))
    }

    fn query_rows(&mut self, sql: &str) -> DbResult<RowSet> {
        if sql.contains("FROM ks_version") {
            let state = self.shared.borrow();
            let rows = match &state.version_row {
                Some((version, target, statements)) => vec![vec![
                    version.clone(),
                    target.clone(),
                    Some(statements.to_string()),
                ]],
                None => Vec::new(),
            };
            return Ok(RowSet {
                columns: vec![
                    "version".to_string(),
                    "target".to_string(),
                    "statements".to_string(),
                ],
                rows,
            });
        }
        Ok(RowSet::default())
    }

    fn duplicate(&self) -> DbResult<Box<dyn Database>> {
        let id = {
            let mut state = self.shared.borrow_mut();
            state.next_conn += 1;
            state.next_conn
        };
        Ok(Box::new(MockDb {
            id,
            shared: Rc::clone(&self.shared),
        }))
    }

    fn backend(&self) -> &'static str {
        "mock"
    }
}

pub struct MockConnector {
    pub shared: Rc<RefCell<MockState>>,
}

impl Connector for MockConnector {
    fn connect(&self, _url: &str) -> DbResult<Box<dyn Database>> {
        let id = {
            let mut state = self.shared.borrow_mut();
            state.next_conn += 1;
            state.next_conn
        };
        Ok(Box::new(MockDb {
            id,
            shared: Rc::clone(&self.shared),
        }))
    }
}

/// A registry with a single mock-backed `default` registration.
pub fn mock_registry() -> (Rc<RefCell<MockState>>, DatabaseRegistry) {
    let shared = Rc::new(RefCell::new(MockState::default()));
    let mut registry = DatabaseRegistry::new(Box::new(MockConnector {
        shared: Rc::clone(&shared),
    }));
    registry.register("default", ":memory:", "admin");
    (shared, registry)
}

/// Progress events captured for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SegmentStarting(String, usize),
    SegmentFinished(String),
    CommandStarting {
        line: usize,
        message: Option<String>,
    },
    CommandFinished,
    Error(String),
    Status(String),
}

pub struct RecordingProgress {
    pub events: Rc<RefCell<Vec<Event>>>,
}

impl RecordingProgress {
    pub fn new() -> (Rc<RefCell<Vec<Event>>>, Self) {
        let events = Rc::new(RefCell::new(Vec::new()));
        let listener = Self {
            events: Rc::clone(&events),
        };
        (events, listener)
    }
}

impl ProgressListener for RecordingProgress {
    fn segment_starting(&mut self, target: &str, persistent: usize) {
        self.events
            .borrow_mut()
            .push(Event::SegmentStarting(target.to_string(), persistent));
    }
    fn segment_finished(&mut self, target: &str) {
        self.events
            .borrow_mut()
            .push(Event::SegmentFinished(target.to_string()));
    }
    fn command_starting(&mut self, command: &Command, message: Option<&str>) {
        self.events.borrow_mut().push(Event::CommandStarting {
            line: command.line,
            message: message.map(str::to_string),
        });
    }
    fn command_finished(&mut self) {
        self.events.borrow_mut().push(Event::CommandFinished);
    }
    fn error(&mut self, message: &str) {
        self.events
            .borrow_mut()
            .push(Event::Error(message.to_string()));
    }
    fn status(&mut self, line: &str) {
        self.events
            .borrow_mut()
            .push(Event::Status(line.to_string()));
    }
}

/// Scan an upgrade file from inline text.
pub fn upgrade_file(text: &str) -> UpgradeFile<StringLineSource> {
    UpgradeFile::scan(StringLineSource::new(text)).expect("test upgrade file scans")
}
