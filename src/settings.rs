//! Run-wide calculation settings and their layering.
//!
//! Precedence, lowest first: built-in defaults, the `global_values` of a JSON
//! input document, a settings file, explicit overrides from the command line.
//! Row-level values in the input table take precedence over all of these.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Progress model used to derive planned and earned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveType {
    #[serde(rename = "linear")]
    Linear,
    #[serde(rename = "s-curve")]
    SCurve,
}

impl CurveType {
    /// Lenient parse of a cell value: `linear`, `s-curve`, `S Curve`, `scurve`.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "linear" => Some(CurveType::Linear),
            "scurve" => Some(CurveType::SCurve),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CurveType::Linear => "linear",
            CurveType::SCurve => "s-curve",
        }
    }
}

impl fmt::Display for CurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub curve: CurveType,
    pub alpha: f64,
    pub beta: f64,
    /// Annual rate, in percent.
    pub inflation_rate: f64,
    pub use_manual_ev: bool,
    pub use_manual_pv: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            curve: CurveType::SCurve,
            alpha: 2.0,
            beta: 2.0,
            inflation_rate: 3.5,
            use_manual_ev: false,
            use_manual_pv: false,
        }
    }
}

impl GlobalSettings {
    /// Reads settings from JSON. Accepts either a bare settings object or a
    /// full project document, in which case its `global_values` are used.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(s)?;
        let settings = match value.get("global_values") {
            Some(inner) => serde_json::from_value(inner.clone())?,
            None => serde_json::from_value(value)?,
        };
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), ?settings, "settings file loaded");
        Ok(settings)
    }
}

/// Individually optional settings, applied on top of a base `GlobalSettings`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsOverrides {
    pub curve: Option<CurveType>,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub inflation_rate: Option<f64>,
    pub use_manual_ev: Option<bool>,
    pub use_manual_pv: Option<bool>,
}

impl SettingsOverrides {
    pub fn apply(&self, base: GlobalSettings) -> GlobalSettings {
        GlobalSettings {
            curve: self.curve.unwrap_or(base.curve),
            alpha: self.alpha.unwrap_or(base.alpha),
            beta: self.beta.unwrap_or(base.beta),
            inflation_rate: self.inflation_rate.unwrap_or(base.inflation_rate),
            use_manual_ev: self.use_manual_ev.unwrap_or(base.use_manual_ev),
            use_manual_pv: self.use_manual_pv.unwrap_or(base.use_manual_pv),
        }
    }
}
