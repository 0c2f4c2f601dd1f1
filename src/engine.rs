//! The EVM calculation pipeline.
//!
//! `compute` turns an input table and run settings into one enriched record
//! per input row. Rows are independent of each other; the only batch-level
//! failures are a missing required column and a table without a single
//! readable date. Everything else degrades to missing values plus warnings.

use chrono::NaiveDate;

use crate::columns::{ColumnMap, Field};
use crate::dates::{normalize_cell, serial_value, MAX_SERIAL};
use crate::error::{ComputationWarning, ValidationError};
use crate::metrics::{
    add_months, annuity_present_value, cap_likely_duration, curve_value, difference,
    fraction_elapsed, monthly_rate, months_between, percent, ratio,
};
use crate::quality::{is_date_like, scan_serial_ranges};
use crate::settings::{CurveType, GlobalSettings};
use crate::types::{EnrichedRecord, InputTable, ProjectRecord};
use crate::util::number_from_raw;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Calculation {
    pub records: Vec<EnrichedRecord>,
    pub warnings: Vec<ComputationWarning>,
}

/// Where planned or earned value comes from for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Manual override column, enabled by the matching settings flag.
    Manual,
    /// Values already present in the input (for example, a re-loaded export).
    Supplied,
    /// Derived from elapsed time and the row's curve.
    Curve,
}

pub fn compute(table: &InputTable, settings: &GlobalSettings) -> Result<Calculation, ValidationError> {
    compute_mapped(table, settings, &[])
}

/// Like [`compute`], binding some canonical fields to explicit headers first.
pub fn compute_mapped(
    table: &InputTable,
    settings: &GlobalSettings,
    overrides: &[(Field, String)],
) -> Result<Calculation, ValidationError> {
    tracing::debug!(rows = table.len(), columns = table.headers.len(), "starting EVM calculation");

    let columns = ColumnMap::resolve(&table.headers, overrides);
    columns.require()?;

    let mut reader = RowReader {
        table,
        columns: &columns,
        warnings: scan_serial_ranges(table),
    };

    let dates: Vec<[Option<NaiveDate>; 3]> = (0..table.len()).map(|row| reader.dates(row)).collect();
    if dates.iter().flatten().all(Option::is_none) {
        return Err(ValidationError::NoValidDates);
    }

    let pv_source = value_source(table, &columns, settings.use_manual_pv, Field::ManualPv, Field::Pv);
    let ev_source = value_source(table, &columns, settings.use_manual_ev, Field::ManualEv, Field::Ev);
    tracing::debug!(?pv_source, ?ev_source, curve = %settings.curve, "value sources selected");

    let records = dates
        .into_iter()
        .enumerate()
        .map(|(row, dates)| {
            let record = reader.record(row, dates, settings);
            evaluate(&record, pv_source, ev_source)
        })
        .collect::<Vec<_>>();

    let warnings = reader.warnings;
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(rows = records.len(), warnings = warnings.len(), "EVM calculation complete");

    Ok(Calculation { records, warnings })
}

fn value_source(
    table: &InputTable,
    columns: &ColumnMap,
    use_manual: bool,
    manual: Field,
    supplied: Field,
) -> ValueSource {
    if use_manual && columns.has(manual) {
        return ValueSource::Manual;
    }
    let has_values = columns
        .get(supplied)
        .is_some_and(|col| table.column(col).any(|v| !v.is_missing()));
    if has_values {
        ValueSource::Supplied
    } else {
        ValueSource::Curve
    }
}

/// Reads typed fields out of raw rows, collecting coercion warnings.
struct RowReader<'a> {
    table: &'a InputTable,
    columns: &'a ColumnMap,
    warnings: Vec<ComputationWarning>,
}

impl RowReader<'_> {
    fn text(&self, row: usize, field: Field) -> String {
        self.columns
            .get(field)
            .and_then(|col| self.table.cell(row, col).as_text())
            .map(|s| s.into_owned())
            .unwrap_or_default()
    }

    fn number(&mut self, row: usize, field: Field) -> Option<f64> {
        let table = self.table;
        let col = self.columns.get(field)?;
        let cell = table.cell(row, col);
        if cell.is_missing() {
            return None;
        }
        let value = number_from_raw(cell);
        if value.is_none() {
            self.warnings.push(ComputationWarning::NonNumeric {
                column: table.headers[col].clone(),
                row,
                value: cell.as_text().map(|s| s.into_owned()).unwrap_or_default(),
            });
        }
        value
    }

    fn date(&mut self, row: usize, field: Field) -> Option<NaiveDate> {
        let table = self.table;
        let col = self.columns.get(field)?;
        let cell = table.cell(row, col);
        if cell.is_missing() {
            return None;
        }
        let date = normalize_cell(cell).date();
        if date.is_none() {
            let header = &table.headers[col];
            // already reported per column by the serial range scan
            let reported = is_date_like(header) && serial_value(cell).is_some_and(|v| v > MAX_SERIAL);
            if !reported {
                self.warnings.push(ComputationWarning::UnparsableDate {
                    column: header.clone(),
                    row,
                    value: cell.as_text().map(|s| s.into_owned()).unwrap_or_default(),
                });
            }
        }
        date
    }

    fn dates(&mut self, row: usize) -> [Option<NaiveDate>; 3] {
        Field::DATES.map(|field| self.date(row, field))
    }

    fn curve(&mut self, row: usize) -> Option<CurveType> {
        let table = self.table;
        let col = self.columns.get(Field::Curve)?;
        let text = table.cell(row, col).as_text()?;
        let curve = CurveType::parse(&text);
        if curve.is_none() {
            self.warnings.push(ComputationWarning::UnknownCurve {
                row,
                value: text.into_owned(),
            });
        }
        curve
    }

    /// Builds the typed record. Curve parameters missing on the row (or
    /// unreadable) take the run-wide value.
    fn record(&mut self, row: usize, dates: [Option<NaiveDate>; 3], settings: &GlobalSettings) -> ProjectRecord {
        let [plan_start_date, plan_finish_date, data_date] = dates;
        let global = |v: f64| v.is_finite().then_some(v);
        ProjectRecord {
            project_id: self.text(row, Field::ProjectId),
            project_name: self.text(row, Field::ProjectName),
            department: self.text(row, Field::Department),
            bac: self.number(row, Field::Bac),
            ac: self.number(row, Field::Ac),
            plan_start_date,
            plan_finish_date,
            data_date,
            ev: self.number(row, Field::Ev),
            pv: self.number(row, Field::Pv),
            curve: self.curve(row).unwrap_or(settings.curve),
            alpha: self.number(row, Field::Alpha).or(global(settings.alpha)),
            beta: self.number(row, Field::Beta).or(global(settings.beta)),
            inflation_rate: self
                .number(row, Field::InflationRate)
                .or(global(settings.inflation_rate)),
            manual_ev: self.number(row, Field::ManualEv),
            manual_pv: self.number(row, Field::ManualPv),
        }
    }
}

/// Derives every metric of one record.
pub fn evaluate(r: &ProjectRecord, pv_source: ValueSource, ev_source: ValueSource) -> EnrichedRecord {
    let actual = months_between(r.plan_start_date, r.data_date);
    let original = months_between(r.plan_start_date, r.plan_finish_date);

    // Actual cost as a level annuity over the elapsed months.
    let rate = monthly_rate(r.inflation_rate);
    let present_value = annuity_present_value(r.ac, actual, rate).or(r.ac);

    // PV and EV share the same elapsed fraction and curve unless overridden.
    let t = fraction_elapsed(actual, original);
    let from_curve = curve_value(r.curve, r.bac, t, r.alpha, r.beta);
    let pick = |source: ValueSource, manual: Option<f64>, supplied: Option<f64>| match source {
        ValueSource::Manual => manual,
        ValueSource::Supplied => supplied,
        ValueSource::Curve => from_curve,
    };
    let pv = pick(pv_source, r.manual_pv, r.pv);
    let ev = pick(ev_source, r.manual_ev, r.ev);

    let cpi = ratio(ev, r.ac);
    let eac = ratio(r.bac, cpi);

    // Earned schedule uses the linear approximation for both curve types.
    let es = ratio(ev, r.bac).zip(original).map(|(f, o)| f * o);
    let spie = ratio(es, actual);
    let ld = cap_likely_duration(ratio(original, spie), original);

    let planned_value_project = annuity_present_value(r.bac, original, rate);
    let likely_value_project = annuity_present_value(r.bac, ld, rate);

    EnrichedRecord {
        project_id: r.project_id.clone(),
        project_name: r.project_name.clone(),
        department: r.department.clone(),
        bac: r.bac,
        ac: r.ac,
        plan_start_date: r.plan_start_date,
        plan_finish_date: r.plan_finish_date,
        data_date: r.data_date,
        curve: Some(r.curve),
        alpha: r.alpha,
        beta: r.beta,
        inflation_rate: r.inflation_rate,
        manual_ev: r.manual_ev,
        manual_pv: r.manual_pv,

        actual_duration_months: actual,
        original_duration_months: original,
        present_value,
        pv,
        ev,
        percent_complete: percent(ev, r.bac),
        cv: difference(ev, r.ac),
        sv: difference(ev, pv),
        cpi,
        spi: ratio(ev, pv),
        tcpi: ratio(difference(r.bac, ev), difference(r.bac, r.ac)),
        eac,
        etc: difference(eac, r.ac),
        vac: difference(r.bac, eac),
        es,
        spie,
        tve: difference(es, actual),
        ld,
        likely_completion: add_months(r.plan_start_date, ld),
        percent_budget_used: percent(r.ac, r.bac),
        percent_time_used: percent(actual, original),
        planned_value_project,
        likely_value_project,
        percent_present_value_project: percent(planned_value_project, r.bac),
        percent_likely_value_project: percent(likely_value_project, r.bac),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn record() -> ProjectRecord {
        ProjectRecord {
            project_id: "P1".to_string(),
            project_name: "Bridge".to_string(),
            department: "Works".to_string(),
            bac: Some(100_000.0),
            ac: Some(40_000.0),
            plan_start_date: ymd(2024, 1, 1),
            plan_finish_date: ymd(2024, 7, 1),
            data_date: ymd(2024, 4, 1),
            ev: None,
            pv: None,
            curve: CurveType::Linear,
            alpha: Some(2.0),
            beta: Some(2.0),
            inflation_rate: Some(3.5),
            manual_ev: Some(10_000.0),
            manual_pv: Some(70_000.0),
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-6)
    }

    #[test]
    fn curve_sources_give_equal_pv_and_ev() {
        let out = evaluate(&record(), ValueSource::Curve, ValueSource::Curve);
        assert!(close(out.pv, 50_000.0));
        assert_eq!(out.pv, out.ev);
        assert!(close(out.cpi, 1.25));
        assert!(close(out.spi, 1.0));
        assert!(close(out.eac, 80_000.0));
        assert!(close(out.etc, 40_000.0));
        assert!(close(out.vac, 20_000.0));
        assert!(close(out.tcpi, 50_000.0 / 60_000.0));
    }

    #[test]
    fn manual_sources_bypass_the_curve() {
        let out = evaluate(&record(), ValueSource::Manual, ValueSource::Manual);
        assert_eq!(out.pv, Some(70_000.0));
        assert_eq!(out.ev, Some(10_000.0));
        assert!(close(out.sv, -60_000.0));
        assert!(close(out.cv, -30_000.0));
    }

    #[test]
    fn earned_schedule_follows_ev_share() {
        let out = evaluate(&record(), ValueSource::Curve, ValueSource::Curve);
        let original = 182.0 / 30.44;
        let actual = 91.0 / 30.44;
        assert!(close(out.es, 0.5 * original));
        assert!(close(out.spie, 0.5 * original / actual));
        assert!(close(out.tve, 0.5 * original - actual));
        assert!(close(out.ld, original / (0.5 * original / actual)));
        assert_eq!(out.likely_completion, add_months(ymd(2024, 1, 1), out.ld));
    }

    #[test]
    fn low_earned_value_hits_the_duration_cap() {
        let mut r = record();
        r.manual_ev = Some(1.0);
        let out = evaluate(&r, ValueSource::Curve, ValueSource::Manual);
        let original = out.original_duration_months.unwrap();
        assert!(close(out.ld, 2.5 * original));
    }

    #[test]
    fn zero_actual_cost_leaves_cost_indices_missing() {
        let mut r = record();
        r.ac = Some(0.0);
        let out = evaluate(&r, ValueSource::Curve, ValueSource::Curve);
        assert_eq!(out.cpi, None);
        assert_eq!(out.eac, None);
        assert_eq!(out.etc, None);
        assert_eq!(out.vac, None);
        assert_eq!(out.present_value, Some(0.0));
    }

    #[test]
    fn zero_budget_leaves_shares_missing() {
        let mut r = record();
        r.bac = Some(0.0);
        let out = evaluate(&r, ValueSource::Curve, ValueSource::Curve);
        assert_eq!(out.percent_complete, None);
        assert_eq!(out.es, None);
        assert_eq!(out.percent_budget_used, None);
        assert_eq!(out.percent_present_value_project, None);
    }

    #[test]
    fn present_value_falls_back_to_actual_cost() {
        let mut r = record();
        r.data_date = r.plan_start_date;
        let out = evaluate(&r, ValueSource::Curve, ValueSource::Curve);
        assert_eq!(out.actual_duration_months, None);
        assert_eq!(out.present_value, Some(40_000.0));
        assert_eq!(out.ev, Some(0.0));
    }

    #[test]
    fn inflation_discounts_present_value() {
        let out = evaluate(&record(), ValueSource::Curve, ValueSource::Curve);
        let pv = out.present_value.unwrap();
        assert!(pv < 40_000.0 && pv > 39_000.0);
        let planned = out.planned_value_project.unwrap();
        assert!(planned < 100_000.0 && planned > 98_000.0);
        assert!(close(out.percent_present_value_project, planned / 1000.0));
    }
}
