//! Scalar building blocks of the EVM pipeline.
//!
//! Every function takes and returns `Option<f64>`: `None` is the one and only
//! "missing" value, and no result is ever NaN or infinite.

use chrono::{NaiveDate, TimeDelta};
use statrs::distribution::{Beta, ContinuousCDF};

use crate::settings::CurveType;
use crate::util::days_diff;

/// Average month length (365.25 / 12) used for every month-based figure.
pub const DAYS_PER_MONTH: f64 = 30.44;

/// Stand-in for a zero monthly rate in the annuity factor.
pub const ZERO_RATE_EPSILON: f64 = 0.0001;

/// Likely duration never exceeds this multiple of the planned duration.
pub const LIKELY_DURATION_CAP: f64 = 2.5;

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// Months from `start` to `end`; non-positive spans are missing.
pub fn months_between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<f64> {
    let months = days_diff(start?, end?) / DAYS_PER_MONTH;
    (months > 0.0).then_some(months)
}

/// Share of the planned duration already elapsed, always within `[0, 1]`.
/// A missing duration counts as no progress.
pub fn fraction_elapsed(actual: Option<f64>, original: Option<f64>) -> f64 {
    actual
        .zip(original)
        .and_then(|(a, o)| finite(a / o))
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

/// Regularized incomplete beta function at `t`; invalid shapes are missing.
pub fn beta_cdf(t: f64, alpha: f64, beta: f64) -> Option<f64> {
    let dist = Beta::new(alpha, beta).ok()?;
    finite(dist.cdf(t.clamp(0.0, 1.0)))
}

/// Cumulative value at elapsed fraction `t` under the given curve.
pub fn curve_value(
    curve: CurveType,
    bac: Option<f64>,
    t: f64,
    alpha: Option<f64>,
    beta: Option<f64>,
) -> Option<f64> {
    let bac = bac?;
    match curve {
        CurveType::Linear => finite(bac * t),
        CurveType::SCurve => finite(bac * beta_cdf(t, alpha?, beta?)?),
    }
}

/// Monthly equivalent of an annual percentage rate. An exact zero becomes
/// `ZERO_RATE_EPSILON` so the annuity factor stays defined.
pub fn monthly_rate(annual_percent: Option<f64>) -> Option<f64> {
    let rate = finite((1.0 + annual_percent? / 100.0).powf(1.0 / 12.0) - 1.0)?;
    Some(if rate == 0.0 { ZERO_RATE_EPSILON } else { rate })
}

/// Present value of `amount` spread as a level payment over `months` and
/// discounted at `rate` per month.
pub fn annuity_present_value(
    amount: Option<f64>,
    months: Option<f64>,
    rate: Option<f64>,
) -> Option<f64> {
    let n = months.filter(|n| *n != 0.0)?;
    let rate = rate?;
    let payment = amount? / n;
    let factor = (1.0 - (1.0 + rate).powf(-n)) / rate;
    finite(payment * factor)
}

/// `num / den`, missing unless `den > 0`.
pub fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    let den = den.filter(|d| *d > 0.0)?;
    finite(num? / den)
}

/// `100 * num / den`, with the same guard as [`ratio`].
pub fn percent(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    ratio(num, den).map(|r| r * 100.0)
}

pub fn difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    finite(a? - b?)
}

/// Caps a likely duration at `LIKELY_DURATION_CAP` times the planned one.
pub fn cap_likely_duration(ld: Option<f64>, original: Option<f64>) -> Option<f64> {
    Some(ld?.min(LIKELY_DURATION_CAP * original?))
}

/// `start` moved forward by `months` average months, truncated to whole days.
pub fn add_months(start: Option<NaiveDate>, months: Option<f64>) -> Option<NaiveDate> {
    let days = finite((months? * DAYS_PER_MONTH).floor())?;
    let delta = TimeDelta::try_days(days as i64)?;
    start?.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn durations_are_positive_or_missing() {
        let m = months_between(ymd(2024, 1, 1), ymd(2024, 4, 1)).unwrap();
        assert!((m - 91.0 / 30.44).abs() < 1e-12);
        assert_eq!(months_between(ymd(2024, 1, 1), ymd(2024, 1, 1)), None);
        assert_eq!(months_between(ymd(2024, 2, 1), ymd(2024, 1, 1)), None);
        assert_eq!(months_between(None, ymd(2024, 1, 1)), None);
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(fraction_elapsed(Some(3.0), Some(6.0)), 0.5);
        assert_eq!(fraction_elapsed(Some(9.0), Some(6.0)), 1.0);
        assert_eq!(fraction_elapsed(Some(-2.0), Some(6.0)), 0.0);
        assert_eq!(fraction_elapsed(None, Some(6.0)), 0.0);
        assert_eq!(fraction_elapsed(Some(3.0), None), 0.0);
    }

    #[test]
    fn linear_curve_is_proportional() {
        assert!(close(curve_value(CurveType::Linear, Some(1000.0), 0.4, None, None), 400.0));
        assert_eq!(curve_value(CurveType::Linear, None, 0.4, None, None), None);
    }

    #[test]
    fn symmetric_s_curve_is_half_at_midpoint() {
        let v = curve_value(CurveType::SCurve, Some(1000.0), 0.5, Some(2.0), Some(2.0));
        assert!(close(v, 500.0));
        // beta(2,2) cdf: 3t^2 - 2t^3
        assert!(close(beta_cdf(0.25, 2.0, 2.0), 3.0 * 0.0625 - 2.0 * 0.015625));
    }

    #[test]
    fn s_curve_with_bad_shape_is_missing() {
        assert_eq!(curve_value(CurveType::SCurve, Some(1000.0), 0.5, None, Some(2.0)), None);
        assert_eq!(curve_value(CurveType::SCurve, Some(1000.0), 0.5, Some(0.0), Some(2.0)), None);
        assert_eq!(curve_value(CurveType::SCurve, Some(1000.0), 0.5, Some(-1.0), Some(2.0)), None);
    }

    #[test]
    fn zero_rate_uses_epsilon() {
        assert_eq!(monthly_rate(Some(0.0)), Some(ZERO_RATE_EPSILON));
        let r = monthly_rate(Some(12.0)).unwrap();
        assert!(((1.0 + r).powi(12) - 1.12).abs() < 1e-12);
        assert_eq!(monthly_rate(None), None);
    }

    #[test]
    fn annuity_is_close_to_amount_for_small_rates() {
        let pv = annuity_present_value(Some(12_000.0), Some(12.0), monthly_rate(Some(0.0))).unwrap();
        assert!(pv < 12_000.0 && pv > 11_990.0);
        assert_eq!(annuity_present_value(Some(12_000.0), None, Some(0.01)), None);
        assert_eq!(annuity_present_value(Some(12_000.0), Some(0.0), Some(0.01)), None);
    }

    #[test]
    fn ratio_guards_non_positive_denominators() {
        assert_eq!(ratio(Some(50.0), Some(40.0)), Some(1.25));
        assert_eq!(ratio(Some(50.0), Some(0.0)), None);
        assert_eq!(ratio(Some(50.0), Some(-1.0)), None);
        assert_eq!(ratio(None, Some(1.0)), None);
        assert_eq!(percent(Some(1.0), Some(4.0)), Some(25.0));
    }

    #[test]
    fn likely_duration_cap() {
        assert_eq!(cap_likely_duration(Some(100.0), Some(6.0)), Some(15.0));
        assert_eq!(cap_likely_duration(Some(7.0), Some(6.0)), Some(7.0));
        assert_eq!(cap_likely_duration(Some(7.0), None), None);
    }

    #[test]
    fn adds_average_months() {
        assert_eq!(add_months(ymd(2024, 1, 1), Some(1.0)), ymd(2024, 1, 31));
        assert_eq!(add_months(ymd(2024, 1, 1), None), None);
        assert_eq!(add_months(None, Some(1.0)), None);
    }
}
