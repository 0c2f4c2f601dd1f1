use std::borrow::Cow;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::settings::CurveType;
use crate::util::is_missing_token;

/// One cell as supplied by the caller, before any coercion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    #[default]
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Builds a text cell, mapping blanks and NA tokens to `Missing`.
    pub fn text(s: &str) -> Self {
        let s = s.trim();
        if is_missing_token(s) {
            RawValue::Missing
        } else {
            RawValue::Text(s.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            RawValue::Missing => true,
            RawValue::Number(n) => n.is_nan(),
            RawValue::Text(s) => is_missing_token(s.trim()),
            RawValue::Bool(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        if self.is_missing() {
            return None;
        }
        match self {
            RawValue::Text(s) => Some(Cow::Borrowed(s.trim())),
            RawValue::Number(n) => Some(Cow::Owned(n.to_string())),
            RawValue::Bool(b) => Some(Cow::Owned(b.to_string())),
            RawValue::Missing => None,
        }
    }
}

static MISSING: RawValue = RawValue::Missing;

/// Row-oriented input: one header row and aligned cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawValue>>,
}

impl InputTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding short rows with `Missing` and dropping surplus cells.
    pub fn push_row(&mut self, mut row: Vec<RawValue>) {
        row.resize(self.headers.len(), RawValue::Missing);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &RawValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&MISSING)
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = &RawValue> + '_ {
        self.rows.iter().map(move |r| r.get(col).unwrap_or(&MISSING))
    }

    /// Removes a column, returning its header.
    pub fn remove_column(&mut self, col: usize) -> String {
        for row in &mut self.rows {
            if col < row.len() {
                row.remove(col);
            }
        }
        self.headers.remove(col)
    }
}

/// A row after column mapping, date normalization, coercion and global backfill.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectRecord {
    pub project_id: String,
    pub project_name: String,
    pub department: String,
    pub bac: Option<f64>,
    pub ac: Option<f64>,
    pub plan_start_date: Option<NaiveDate>,
    pub plan_finish_date: Option<NaiveDate>,
    pub data_date: Option<NaiveDate>,
    pub ev: Option<f64>,
    pub pv: Option<f64>,
    pub curve: CurveType,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub inflation_rate: Option<f64>,
    pub manual_ev: Option<f64>,
    pub manual_pv: Option<f64>,
}

/// Output row: the canonical input fields followed by every derived metric.
/// Derived fields are always present in the schema and `None` when undefined.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub project_id: String,
    pub project_name: String,
    pub department: String,
    pub bac: Option<f64>,
    pub ac: Option<f64>,
    pub plan_start_date: Option<NaiveDate>,
    pub plan_finish_date: Option<NaiveDate>,
    pub data_date: Option<NaiveDate>,
    pub curve: Option<CurveType>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub inflation_rate: Option<f64>,
    pub manual_ev: Option<f64>,
    pub manual_pv: Option<f64>,

    pub actual_duration_months: Option<f64>,
    pub original_duration_months: Option<f64>,
    pub present_value: Option<f64>,
    pub pv: Option<f64>,
    pub ev: Option<f64>,
    pub percent_complete: Option<f64>,
    pub cv: Option<f64>,
    pub sv: Option<f64>,
    pub cpi: Option<f64>,
    pub spi: Option<f64>,
    pub tcpi: Option<f64>,
    pub eac: Option<f64>,
    pub etc: Option<f64>,
    pub vac: Option<f64>,
    pub es: Option<f64>,
    pub spie: Option<f64>,
    pub tve: Option<f64>,
    pub ld: Option<f64>,
    pub likely_completion: Option<NaiveDate>,
    pub percent_budget_used: Option<f64>,
    pub percent_time_used: Option<f64>,
    pub planned_value_project: Option<f64>,
    pub likely_value_project: Option<f64>,
    pub percent_present_value_project: Option<f64>,
    pub percent_likely_value_project: Option<f64>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ResultRow {
    #[serde(rename = "ProjectID")]
    #[tabled(rename = "ProjectID")]
    pub project_id: String,
    #[serde(rename = "ProjectName")]
    #[tabled(rename = "ProjectName")]
    pub project_name: String,
    #[serde(rename = "BAC")]
    #[tabled(rename = "BAC")]
    pub bac: String,
    #[serde(rename = "AC")]
    #[tabled(rename = "AC")]
    pub ac: String,
    #[serde(rename = "EV")]
    #[tabled(rename = "EV")]
    pub ev: String,
    #[serde(rename = "PV")]
    #[tabled(rename = "PV")]
    pub pv: String,
    #[serde(rename = "CPI")]
    #[tabled(rename = "CPI")]
    pub cpi: String,
    #[serde(rename = "SPI")]
    #[tabled(rename = "SPI")]
    pub spi: String,
    #[serde(rename = "CV")]
    #[tabled(rename = "CV")]
    pub cv: String,
    #[serde(rename = "SV")]
    #[tabled(rename = "SV")]
    pub sv: String,
    #[serde(rename = "PercentComplete")]
    #[tabled(rename = "PercentComplete")]
    pub percent_complete: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct HistoryRow {
    #[serde(rename = "DataDate")]
    #[tabled(rename = "DataDate")]
    pub data_date: String,
    #[serde(rename = "BAC")]
    #[tabled(rename = "BAC")]
    pub bac: String,
    #[serde(rename = "AC")]
    #[tabled(rename = "AC")]
    pub ac: String,
    #[serde(rename = "PV")]
    #[tabled(rename = "PV")]
    pub pv: String,
    #[serde(rename = "EV")]
    #[tabled(rename = "EV")]
    pub ev: String,
    #[serde(rename = "CPI")]
    #[tabled(rename = "CPI")]
    pub cpi: String,
    #[serde(rename = "SPI")]
    #[tabled(rename = "SPI")]
    pub spi: String,
    #[serde(rename = "CV")]
    #[tabled(rename = "CV")]
    pub cv: String,
    #[serde(rename = "SV")]
    #[tabled(rename = "SV")]
    pub sv: String,
    #[serde(rename = "PercentComplete")]
    #[tabled(rename = "PercentComplete")]
    pub percent_complete: String,
    #[serde(rename = "EAC")]
    #[tabled(rename = "EAC")]
    pub eac: String,
    #[serde(rename = "VAC")]
    #[tabled(rename = "VAC")]
    pub vac: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_projects: usize,
    pub avg_cpi: Option<f64>,
    pub avg_spi: Option<f64>,
    pub total_cv: Option<f64>,
    pub avg_percent_complete: Option<f64>,
}
