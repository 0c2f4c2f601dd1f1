//! Canonical field names and the mapping from caller-supplied headers onto them.

use std::collections::HashMap;

use crate::error::{EvmError, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ProjectId,
    ProjectName,
    Department,
    Bac,
    Ac,
    PlanStartDate,
    PlanFinishDate,
    DataDate,
    Ev,
    Pv,
    Curve,
    Alpha,
    Beta,
    InflationRate,
    ManualEv,
    ManualPv,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::ProjectId,
        Field::ProjectName,
        Field::Department,
        Field::Bac,
        Field::Ac,
        Field::PlanStartDate,
        Field::PlanFinishDate,
        Field::DataDate,
        Field::Ev,
        Field::Pv,
        Field::Curve,
        Field::Alpha,
        Field::Beta,
        Field::InflationRate,
        Field::ManualEv,
        Field::ManualPv,
    ];

    pub const REQUIRED: [Field; 8] = [
        Field::ProjectId,
        Field::ProjectName,
        Field::Department,
        Field::Bac,
        Field::Ac,
        Field::PlanStartDate,
        Field::PlanFinishDate,
        Field::DataDate,
    ];

    pub const DATES: [Field; 3] = [Field::PlanStartDate, Field::PlanFinishDate, Field::DataDate];

    pub fn key(self) -> &'static str {
        match self {
            Field::ProjectId => "project_id",
            Field::ProjectName => "project_name",
            Field::Department => "department",
            Field::Bac => "bac",
            Field::Ac => "ac",
            Field::PlanStartDate => "plan_start_date",
            Field::PlanFinishDate => "plan_finish_date",
            Field::DataDate => "data_date",
            Field::Ev => "ev",
            Field::Pv => "pv",
            Field::Curve => "curve",
            Field::Alpha => "alpha",
            Field::Beta => "beta",
            Field::InflationRate => "inflation_rate",
            Field::ManualEv => "manual_ev",
            Field::ManualPv => "manual_pv",
        }
    }

    /// Human-facing header as it appears in spreadsheet input.
    pub fn label(self) -> &'static str {
        match self {
            Field::ProjectId => "Project ID",
            Field::ProjectName => "Project Name",
            Field::Department => "Department",
            Field::Bac => "Budget (BAC)",
            Field::Ac => "Actual Cost (AC)",
            Field::PlanStartDate => "Plan Start Date",
            Field::PlanFinishDate => "Plan Finish Date",
            Field::DataDate => "Data Date",
            Field::Ev => "Earned Value (EV)",
            Field::Pv => "Planned Value (PV)",
            Field::Curve => "Curve",
            Field::Alpha => "Alpha",
            Field::Beta => "Beta",
            Field::InflationRate => "Inflation Rate",
            Field::ManualEv => "Manual EV",
            Field::ManualPv => "Manual PV",
        }
    }

    /// Matches a header against either the label or the canonical key,
    /// ignoring case and surrounding/repeated whitespace.
    pub fn from_header(header: &str) -> Option<Field> {
        let wanted = squash(header);
        Field::ALL
            .into_iter()
            .find(|f| squash(f.key()) == wanted || squash(f.label()) == wanted)
    }
}

fn squash(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// Parses a `field=Header` override, e.g. `bac=Total Budget`.
pub fn parse_mapping(arg: &str) -> Result<(Field, String), EvmError> {
    let (field, header) = arg
        .split_once('=')
        .ok_or_else(|| EvmError::InvalidMapping(arg.to_string()))?;
    let field = Field::from_header(field).ok_or_else(|| EvmError::InvalidMapping(arg.to_string()))?;
    let header = header.trim();
    if header.is_empty() {
        return Err(EvmError::InvalidMapping(arg.to_string()));
    }
    Ok((field, header.to_string()))
}

/// Which input column (by index) feeds each canonical field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    slots: HashMap<Field, usize>,
}

impl ColumnMap {
    /// Explicit overrides are bound first; remaining headers are matched by
    /// label or key. The first header claiming a field wins.
    pub fn resolve(headers: &[String], overrides: &[(Field, String)]) -> Self {
        let mut slots = HashMap::new();
        let mut claimed = vec![false; headers.len()];

        for (field, wanted) in overrides {
            if let Some(idx) = headers.iter().position(|h| h.trim() == wanted.trim()) {
                slots.insert(*field, idx);
                claimed[idx] = true;
            } else {
                tracing::warn!(field = field.key(), header = %wanted, "mapped header not present in input");
            }
        }

        for (idx, header) in headers.iter().enumerate() {
            if claimed[idx] {
                continue;
            }
            if let Some(field) = Field::from_header(header) {
                slots.entry(field).or_insert(idx);
            }
        }

        Self { slots }
    }

    pub fn get(&self, field: Field) -> Option<usize> {
        self.slots.get(&field).copied()
    }

    pub fn has(&self, field: Field) -> bool {
        self.slots.contains_key(&field)
    }

    /// Fails on the first required field with no column behind it.
    pub fn require(&self) -> Result<(), ValidationError> {
        match Field::REQUIRED.into_iter().find(|f| !self.has(*f)) {
            Some(field) => Err(ValidationError::MissingColumn {
                column: field.key().to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn headers_match_labels_and_keys() {
        assert_eq!(Field::from_header("Budget (BAC)"), Some(Field::Bac));
        assert_eq!(Field::from_header("  budget   (bac) "), Some(Field::Bac));
        assert_eq!(Field::from_header("plan_start_date"), Some(Field::PlanStartDate));
        assert_eq!(Field::from_header("Manual EV"), Some(Field::ManualEv));
        assert_eq!(Field::from_header("Owner"), None);
    }

    #[test]
    fn overrides_bind_custom_headers() {
        let h = headers(&["Total Budget", "Budget (BAC)", "Data Date"]);
        let map = ColumnMap::resolve(&h, &[(Field::Bac, "Total Budget".to_string())]);
        assert_eq!(map.get(Field::Bac), Some(0));
        assert_eq!(map.get(Field::DataDate), Some(2));
    }

    #[test]
    fn missing_required_column_is_reported_by_key() {
        let h = headers(&[
            "Project ID",
            "Project Name",
            "Department",
            "Budget (BAC)",
            "Actual Cost (AC)",
            "Plan Start Date",
            "Plan Finish Date",
        ]);
        let err = ColumnMap::resolve(&h, &[]).require().unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumn {
                column: "data_date".to_string()
            }
        );
    }

    #[test]
    fn mapping_argument_parses() {
        let (field, header) = parse_mapping("bac = Total Budget").unwrap();
        assert_eq!(field, Field::Bac);
        assert_eq!(header, "Total Budget");
        assert!(parse_mapping("nonsense").is_err());
        assert!(parse_mapping("owner=Someone").is_err());
        assert!(parse_mapping("bac=").is_err());
    }
}
