use crate::columns::Field;
use crate::error::Result;
use crate::settings::GlobalSettings;
use crate::types::{InputTable, RawValue};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub columns: usize,
    pub dropped_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedInput {
    pub table: InputTable,
    /// Present only when the input was a JSON document carrying them.
    pub settings: Option<GlobalSettings>,
    pub report: LoadReport,
}

/// Picks the decoder from the file extension; anything but `.json` is CSV.
pub fn load_path(path: impl AsRef<Path>) -> Result<LoadedInput> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let file = std::fs::File::open(path)?;
    let loaded = if is_json { read_json(file)? } else { read_csv(file)? };
    tracing::info!(
        path = %path.display(),
        rows = loaded.report.total_rows,
        columns = loaded.report.columns,
        "input loaded"
    );
    Ok(loaded)
}

/// Reads a CSV export. Every cell is kept as text; blanks and NA tokens
/// become missing. Unrecognized columns with no values at all, and `Unnamed`
/// columns left behind by spreadsheet exports, are dropped.
pub fn read_csv<R: Read>(reader: R) -> Result<LoadedInput> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut table = InputTable::new(headers);

    for result in rdr.records() {
        let record = result?;
        table.push_row(record.iter().map(RawValue::text).collect());
    }

    let dropped_columns = drop_empty_columns(&mut table);
    Ok(finish(table, None, dropped_columns))
}

#[derive(Debug, Deserialize)]
struct ProjectDocument {
    #[serde(default)]
    global_values: Option<GlobalSettings>,
    projects: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Reads a `{ "global_values": {..}, "projects": [..] }` document.
/// Headers are the union of the project keys in first-seen order.
pub fn read_json<R: Read>(reader: R) -> Result<LoadedInput> {
    let doc: ProjectDocument = serde_json::from_reader(reader)?;

    let mut headers: Vec<String> = Vec::new();
    for project in &doc.projects {
        for key in project.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let mut table = InputTable::new(headers);
    for project in &doc.projects {
        let row = table
            .headers
            .iter()
            .map(|h| project.get(h).map(raw_from_json).unwrap_or_default())
            .collect();
        table.push_row(row);
    }

    Ok(finish(table, doc.global_values, Vec::new()))
}

fn raw_from_json(value: &serde_json::Value) -> RawValue {
    use serde_json::Value;
    match value {
        Value::Null => RawValue::Missing,
        Value::Bool(b) => RawValue::Bool(*b),
        Value::Number(n) => n.as_f64().map_or(RawValue::Missing, RawValue::Number),
        Value::String(s) => RawValue::text(s),
        other => RawValue::Text(other.to_string()),
    }
}

fn drop_empty_columns(table: &mut InputTable) -> Vec<String> {
    let mut dropped = Vec::new();
    let mut col = table.headers.len();
    while col > 0 {
        col -= 1;
        let header = &table.headers[col];
        let unnamed = header.is_empty() || header.to_ascii_lowercase().starts_with("unnamed");
        // a blank canonical column is still structurally present
        let empty = Field::from_header(header).is_none() && table.column(col).all(RawValue::is_missing);
        if unnamed || empty {
            dropped.push(table.remove_column(col));
        }
    }
    dropped.reverse();
    if !dropped.is_empty() {
        tracing::debug!(?dropped, "dropped empty or unnamed columns");
    }
    dropped
}

fn finish(table: InputTable, settings: Option<GlobalSettings>, dropped_columns: Vec<String>) -> LoadedInput {
    let report = LoadReport {
        total_rows: table.len(),
        columns: table.headers.len(),
        dropped_columns,
    };
    LoadedInput {
        table,
        settings,
        report,
    }
}
