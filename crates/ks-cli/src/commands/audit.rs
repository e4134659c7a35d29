//! Log command implementation: print or export the upgrade audit log.

use anyhow::{Context, Result};
use ks_db::Database;
use ks_engine::LOG_TABLE;
use serde_json::{Map, Value};

use crate::cli::{GlobalArgs, LogArgs};
use crate::commands::common::{load_config, open_default};

/// Execute the log command
pub(crate) fn execute(args: &LogArgs, global: &GlobalArgs) -> Result<()> {
    let (config, project_dir) = load_config(global)?;
    let mut db = open_default(&config, &project_dir)?;

    if !db.relation_exists(LOG_TABLE)? {
        println!("No audit log: table {LOG_TABLE} does not exist.");
        return Ok(());
    }

    let rows = db.query_rows(&format!(
        "SELECT source, target, statement, stamp, command, result FROM {LOG_TABLE} ORDER BY stamp"
    ))?;

    if let Some(path) = &args.export {
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
        let json = serde_json::to_string_pretty(&Value::Array(records))?;
        std::fs::write(path, json).with_context(|| format!("failed to write '{path}'"))?;
        println!("Exported {} log record(s) to {path}", rows.rows.len());
        return Ok(());
    }

    if rows.rows.is_empty() {
        println!("The audit log is empty.");
        return Ok(());
    }
    for row in &rows.rows {
        let cell = |i: usize| row.get(i).cloned().flatten().unwrap_or_default();
        let statement = match row.get(2).cloned().flatten() {
            Some(n) => format!("#{n}"),
            None => "--".to_string(),
        };
        let summary = match row.get(5).cloned().flatten() {
            Some(result) => result,
            None => cell(4).lines().next().unwrap_or("").to_string(),
        };
        println!(
            "{}  {} -> {}  {}  {}",
            cell(3),
            cell(0),
            cell(1),
            statement,
            summary
        );
    }
    Ok(())
}
