use crate::error::Result;
use crate::settings::GlobalSettings;
use crate::types::EnrichedRecord;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    to_csv_writer(file, rows)
}

/// Flat encoding: one header row, one row per record, missing as empty cells.
pub fn to_csv_writer<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut file, value)?;
    file.flush()?;
    Ok(())
}

/// Structured encoding; the only one that carries settings alongside data.
#[derive(Debug, Serialize)]
pub struct ExportDocument<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_values: Option<&'a GlobalSettings>,
    pub projects: &'a [EnrichedRecord],
}

pub fn write_document(
    path: impl AsRef<Path>,
    records: &[EnrichedRecord],
    settings: Option<&GlobalSettings>,
) -> Result<()> {
    let doc = ExportDocument {
        global_values: settings,
        projects: records,
    };
    write_json(path, &doc)
}

/// Prints at most `max_rows` rows as a markdown table under a title line.
pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{title}");
    if let Some(n) = note {
        println!("({n})");
    }
    println!();
    if rows.is_empty() || max_rows == 0 {
        println!("(no rows)\n");
        return;
    }
    let mut table = Table::new(rows.iter().take(max_rows).cloned());
    table.with(Style::markdown());
    println!("{table}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> EnrichedRecord {
        EnrichedRecord {
            project_id: "P1".into(),
            bac: Some(1000.0),
            data_date: NaiveDate::from_ymd_opt(2024, 4, 1),
            cpi: None,
            ..Default::default()
        }
    }

    #[test]
    fn csv_uses_canonical_headers_and_iso_dates() {
        let mut buf = Vec::new();
        to_csv_writer(&mut buf, &[record()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("project_id,project_name,department,bac,ac,plan_start_date"));
        assert!(header.contains(",likely_completion,"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("P1,,,1000.0,,,,2024-04-01,"));
    }

    #[test]
    fn document_omits_settings_when_not_requested() {
        let records = [record()];
        let doc = ExportDocument {
            global_values: None,
            projects: &records,
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("global_values").is_none());
        assert_eq!(value["projects"][0]["data_date"], "2024-04-01");
        assert!(value["projects"][0]["cpi"].is_null());
    }
}
