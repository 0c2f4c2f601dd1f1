//! Earned Value Management metrics for a portfolio of projects.
//!
//! Input rows (CSV or a JSON project document) are normalized, validated and
//! enriched with planned/earned value, performance indices, forecasts,
//! earned-schedule figures and inflation-adjusted projections.

pub mod columns;
pub mod dates;
pub mod engine;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod quality;
pub mod reports;
pub mod session;
pub mod settings;
pub mod types;
pub mod util;

pub use engine::{compute, compute_mapped, Calculation};
pub use error::{ComputationWarning, EvmError, Result, ValidationError};
pub use session::Session;
pub use settings::{CurveType, GlobalSettings, SettingsOverrides};
pub use types::{EnrichedRecord, InputTable, RawValue};
