use thiserror::Error;

/// Batch-wide failures. No partial result is produced when one of these is raised.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Required column '{column}' not found in data")]
    MissingColumn { column: String },

    #[error(
        "No valid dates found in data. Expected formats: YYYY-MM-DD, MM/DD/YYYY, \
         or spreadsheet serial numbers (1-50000)"
    )]
    NoValidDates,
}

/// Advisory findings collected while computing. The affected value resolves to
/// missing and the calculation carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationWarning {
    #[error(
        "Column '{column}' has {count} values > 50,000 (max: {max:.0}). \
         These are not valid dates and will be treated as missing."
    )]
    SerialOutOfRange {
        column: String,
        count: usize,
        max: f64,
    },

    #[error("Row {row}: could not read '{value}' in column '{column}' as a date")]
    UnparsableDate {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Row {row}: could not read '{value}' in column '{column}' as a number")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Row {row}: unknown curve '{value}', using the global curve")]
    UnknownCurve { row: usize, value: String },
}

#[derive(Debug, Error)]
pub enum EvmError {
    #[error("Data validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Calculation not ready: no {missing} loaded")]
    SessionNotReady { missing: &'static str },

    #[error("Project '{0}' not found in results")]
    UnknownProject(String),

    #[error("Invalid column mapping '{0}': expected field=Header")]
    InvalidMapping(String),
}

pub type Result<T> = std::result::Result<T, EvmError>;
