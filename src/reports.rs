use crate::error::{EvmError, Result};
use crate::types::{EnrichedRecord, HistoryRow, PortfolioSummary, ResultRow};
use crate::util::{average, format_date, format_optional, total};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

pub fn portfolio_summary(data: &[EnrichedRecord]) -> PortfolioSummary {
    PortfolioSummary {
        total_projects: data.len(),
        avg_cpi: average(data.iter().map(|r| r.cpi)),
        avg_spi: average(data.iter().map(|r| r.spi)),
        total_cv: total(data.iter().map(|r| r.cv)),
        avg_percent_complete: average(data.iter().map(|r| r.percent_complete)),
    }
}

/// Distinct `(project_id, project_name)` pairs in first-seen order.
pub fn project_index(data: &[EnrichedRecord]) -> Vec<(String, String)> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    data.iter()
        .filter(|r| seen.insert((r.project_id.as_str(), r.project_name.as_str())))
        .map(|r| (r.project_id.clone(), r.project_name.clone()))
        .collect()
}

/// All records of one project, oldest data date first; undated records last.
pub fn project_history<'a>(data: &'a [EnrichedRecord], project_id: &str) -> Result<Vec<&'a EnrichedRecord>> {
    let mut rows: Vec<&EnrichedRecord> = data.iter().filter(|r| r.project_id == project_id).collect();
    if rows.is_empty() {
        return Err(EvmError::UnknownProject(project_id.to_string()));
    }
    // stable sort keeps input order among equal dates
    rows.sort_by(|a, b| match (a.data_date, b.data_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    Ok(rows)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthBand {
    OnTrack,
    Watch,
    Critical,
    NoData,
}

impl HealthBand {
    /// `>= 1.0` on track, `>= 0.9` watch, anything lower critical.
    pub fn from_index(index: Option<f64>) -> Self {
        match index {
            None => HealthBand::NoData,
            Some(i) if i >= 1.0 => HealthBand::OnTrack,
            Some(i) if i >= 0.9 => HealthBand::Watch,
            Some(_) => HealthBand::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthAssessment {
    pub cost: HealthBand,
    pub cpi: Option<f64>,
    pub schedule: HealthBand,
    pub spi: Option<f64>,
}

pub fn assess_health(record: &EnrichedRecord) -> HealthAssessment {
    HealthAssessment {
        cost: HealthBand::from_index(record.cpi),
        cpi: record.cpi,
        schedule: HealthBand::from_index(record.spi),
        spi: record.spi,
    }
}

impl HealthAssessment {
    pub fn cost_label(&self) -> &'static str {
        match self.cost {
            HealthBand::OnTrack => "Under Budget",
            HealthBand::Watch => "Slightly Over Budget",
            HealthBand::Critical => "Significantly Over Budget",
            HealthBand::NoData => "No CPI data available",
        }
    }

    pub fn schedule_label(&self) -> &'static str {
        match self.schedule {
            HealthBand::OnTrack => "Ahead of Schedule",
            HealthBand::Watch => "Slightly Behind Schedule",
            HealthBand::Critical => "Significantly Behind Schedule",
            HealthBand::NoData => "No SPI data available",
        }
    }
}

impl fmt::Display for HealthAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cost: {} (CPI: {})\nSchedule: {} (SPI: {})",
            self.cost_label(),
            format_optional(self.cpi, 2),
            self.schedule_label(),
            format_optional(self.spi, 2)
        )
    }
}

pub fn result_rows(data: &[EnrichedRecord]) -> Vec<ResultRow> {
    data.iter()
        .map(|r| ResultRow {
            project_id: r.project_id.clone(),
            project_name: r.project_name.clone(),
            bac: format_optional(r.bac, 2),
            ac: format_optional(r.ac, 2),
            ev: format_optional(r.ev, 2),
            pv: format_optional(r.pv, 2),
            cpi: format_optional(r.cpi, 2),
            spi: format_optional(r.spi, 2),
            cv: format_optional(r.cv, 2),
            sv: format_optional(r.sv, 2),
            percent_complete: format_optional(r.percent_complete, 1),
        })
        .collect()
}

pub fn history_rows(history: &[&EnrichedRecord]) -> Vec<HistoryRow> {
    history
        .iter()
        .map(|r| HistoryRow {
            data_date: format_date(r.data_date),
            bac: format_optional(r.bac, 2),
            ac: format_optional(r.ac, 2),
            pv: format_optional(r.pv, 2),
            ev: format_optional(r.ev, 2),
            cpi: format_optional(r.cpi, 2),
            spi: format_optional(r.spi, 2),
            cv: format_optional(r.cv, 2),
            sv: format_optional(r.sv, 2),
            percent_complete: format_optional(r.percent_complete, 1),
            eac: format_optional(r.eac, 2),
            vac: format_optional(r.vac, 2),
        })
        .collect()
}
