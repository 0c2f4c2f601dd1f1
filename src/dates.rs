//! Per-cell date normalization.
//!
//! Each cell runs through an ordered list of strategies. A strategy either
//! settles the cell (a date, or missing) or declines and lets the next one try.
//! Nothing here fails: a cell no strategy can read is missing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

use crate::types::RawValue;
use crate::util::is_missing_token;

/// Inclusive bounds of the spreadsheet serial numbers accepted as dates.
pub const MIN_SERIAL: f64 = 1.0;
pub const MAX_SERIAL: f64 = 50_000.0;

/// Day zero of the spreadsheet serial convention.
pub fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateCell {
    Valid(NaiveDate),
    Missing,
}

impl DateCell {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            DateCell::Valid(d) => Some(d),
            DateCell::Missing => None,
        }
    }
}

enum Attempt {
    Settled(DateCell),
    Declined,
}

type Strategy = fn(&str) -> Attempt;

const STRATEGIES: &[Strategy] = &[missing_token, spreadsheet_serial, calendar_text];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%d-%B-%Y",
    "%b-%d-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

fn missing_token(s: &str) -> Attempt {
    if is_missing_token(s) {
        Attempt::Settled(DateCell::Missing)
    } else {
        Attempt::Declined
    }
}

/// Anything that reads as a number is settled here, in range or not.
fn spreadsheet_serial(s: &str) -> Attempt {
    match s.parse::<f64>() {
        Ok(v) => Attempt::Settled(from_serial(v)),
        Err(_) => Attempt::Declined,
    }
}

fn calendar_text(s: &str) -> Attempt {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Attempt::Settled(DateCell::Valid(dt.date_naive()));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Attempt::Settled(DateCell::Valid(dt.date()));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Attempt::Settled(DateCell::Valid(d));
        }
    }
    Attempt::Declined
}

/// Converts a serial day count; the fractional part (time of day) is dropped.
pub fn from_serial(value: f64) -> DateCell {
    if !(MIN_SERIAL..=MAX_SERIAL).contains(&value) {
        return DateCell::Missing;
    }
    serial_epoch()
        .checked_add_signed(TimeDelta::days(value.floor() as i64))
        .map_or(DateCell::Missing, DateCell::Valid)
}

pub fn to_serial(date: NaiveDate) -> f64 {
    (date - serial_epoch()).num_days() as f64
}

pub fn normalize_text(s: &str) -> DateCell {
    let s = s.trim();
    STRATEGIES
        .iter()
        .find_map(|strategy| match strategy(s) {
            Attempt::Settled(cell) => Some(cell),
            Attempt::Declined => None,
        })
        .unwrap_or(DateCell::Missing)
}

pub fn normalize_cell(value: &RawValue) -> DateCell {
    match value {
        RawValue::Missing | RawValue::Bool(_) => DateCell::Missing,
        RawValue::Number(n) => from_serial(*n),
        RawValue::Text(s) => normalize_text(s),
    }
}

/// Numeric reading of a date-column cell, used by the range diagnostics.
pub fn serial_value(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Number(n) if n.is_finite() => Some(*n),
        RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
