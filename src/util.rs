// Cell coercion, Option-aware statistics and console formatting.
//
// This module centralizes the "dirty" cell/number handling so the engine
// can work with `Option<f64>` and treat `None` as the only missing marker.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

use crate::types::RawValue;

/// Tokens that stand for "no value" in spreadsheet and dataframe exports.
const MISSING_TOKENS: &[&str] = &[
    "", "nan", "-nan", "nat", "none", "null", "na", "n/a", "#n/a", "<na>",
];

/// True for blank strings and the NA spellings above (case-insensitive).
pub fn is_missing_token(s: &str) -> bool {
    let s = s.trim();
    MISSING_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t))
}

/// Lenient numeric parse for spreadsheet text: surrounding whitespace and
/// thousands separators are ignored, exponents are accepted, and anything
/// else alphabetic (or a non-finite result) is `None`.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric coercion of a raw cell. Booleans are not numbers.
pub fn number_from_raw(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Number(n) if n.is_finite() => Some(*n),
        RawValue::Text(s) => parse_f64_safe(Some(s.as_str())),
        _ => None,
    }
}

pub fn days_diff(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64
}

/// Arithmetic mean of the present values; `None` when nothing is present.
pub fn average<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Sum of the present values; `None` when nothing is present.
pub fn total<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Fixed decimals with `en` thousands separators, e.g. `1,234,567.89`.
/// Values that round to zero never render with a minus sign.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let grouped = whole
        .parse::<u64>()
        .map(|w| w.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| whole.to_string());
    let body = if frac.is_empty() {
        grouped
    } else {
        format!("{grouped}.{frac}")
    };
    let is_zero = !fixed.bytes().any(|b| matches!(b, b'1'..=b'9'));
    if n.is_sign_negative() && !is_zero {
        format!("-{body}")
    } else {
        body
    }
}

/// `format_number` for optional metrics; missing renders as `N/A`.
pub fn format_optional(n: Option<f64>, decimals: usize) -> String {
    n.map(|v| format_number(v, decimals))
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn format_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Row and column counts for console messages.
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_with_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,250,000.50 ")), Some(1_250_000.5));
        assert_eq!(parse_f64_safe(Some("1e3")), Some(1000.0));
        assert_eq!(parse_f64_safe(Some("abc")), None);
        assert_eq!(parse_f64_safe(Some("nan")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn recognizes_missing_tokens() {
        for token in ["", "  ", "NaN", "nan", "NaT", "None", "null", "NULL", "N/A", "<NA>"] {
            assert!(is_missing_token(token), "{token:?} should be missing");
        }
        assert!(!is_missing_token("2024-01-01"));
        assert!(!is_missing_token("0"));
    }

    #[test]
    fn average_and_total_skip_missing() {
        assert_eq!(average([Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(average([None, None]), None);
        assert_eq!(total([Some(-5.0), None, Some(2.5)]), Some(-2.5));
        assert_eq!(total(Vec::<Option<f64>>::new()), None);
    }

    #[test]
    fn formats_with_thousands_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-10000.0, 0), "-10,000");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_optional(None, 2), "N/A");
        assert_eq!(format_int(9855_i64), "9,855");
    }
}
