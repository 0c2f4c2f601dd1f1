//! Date-column diagnostics over the raw input headers.
//!
//! These never block a calculation. They explain why dates came out missing,
//! usually numeric columns holding values that are not spreadsheet serials.

use serde::Serialize;

use crate::dates::{serial_value, MAX_SERIAL, MIN_SERIAL};
use crate::error::ComputationWarning;
use crate::types::InputTable;

const SAMPLE_LIMIT: usize = 5;

/// Headers that look like they hold dates, mapped or not.
pub fn is_date_like(header: &str) -> bool {
    let h = header.to_ascii_lowercase();
    ["date", "start", "finish"].iter().any(|k| h.contains(k))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateColumnProfile {
    pub column: String,
    pub total_rows: usize,
    pub numeric_count: usize,
    pub numeric_min: Option<f64>,
    pub numeric_max: Option<f64>,
    /// Row indices whose numeric value exceeds the serial range.
    pub out_of_range_rows: Vec<usize>,
    pub below_range: bool,
    pub non_numeric_count: usize,
    pub non_numeric_samples: Vec<String>,
}

impl DateColumnProfile {
    pub fn has_issues(&self) -> bool {
        !self.out_of_range_rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DateQualityReport {
    pub columns: Vec<DateColumnProfile>,
}

impl DateQualityReport {
    pub fn has_issues(&self) -> bool {
        self.columns.iter().any(DateColumnProfile::has_issues)
    }
}

fn profile_column(table: &InputTable, col: usize) -> DateColumnProfile {
    let mut profile = DateColumnProfile {
        column: table.headers[col].clone(),
        total_rows: table.len(),
        numeric_count: 0,
        numeric_min: None,
        numeric_max: None,
        out_of_range_rows: Vec::new(),
        below_range: false,
        non_numeric_count: 0,
        non_numeric_samples: Vec::new(),
    };

    for (row, cell) in table.column(col).enumerate() {
        if cell.is_missing() {
            continue;
        }
        match serial_value(cell) {
            Some(v) => {
                profile.numeric_count += 1;
                profile.numeric_min = Some(profile.numeric_min.map_or(v, |m| m.min(v)));
                profile.numeric_max = Some(profile.numeric_max.map_or(v, |m| m.max(v)));
                if v > MAX_SERIAL {
                    profile.out_of_range_rows.push(row);
                }
                if v < MIN_SERIAL {
                    profile.below_range = true;
                }
            }
            None => {
                profile.non_numeric_count += 1;
                if profile.non_numeric_samples.len() < SAMPLE_LIMIT {
                    if let Some(text) = cell.as_text() {
                        profile.non_numeric_samples.push(text.into_owned());
                    }
                }
            }
        }
    }
    profile
}

pub fn profile_date_columns(table: &InputTable) -> DateQualityReport {
    let columns = table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| is_date_like(h))
        .map(|(idx, _)| profile_column(table, idx))
        .collect();
    DateQualityReport { columns }
}

/// One warning per date-like column holding numbers above the serial range.
pub fn scan_serial_ranges(table: &InputTable) -> Vec<ComputationWarning> {
    profile_date_columns(table)
        .columns
        .into_iter()
        .filter(DateColumnProfile::has_issues)
        .map(|p| ComputationWarning::SerialOutOfRange {
            // an out-of-range value exists, so the column max is one of them
            max: p.numeric_max.unwrap_or(MAX_SERIAL),
            count: p.out_of_range_rows.len(),
            column: p.column,
        })
        .collect()
}
