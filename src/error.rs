//! Error taxonomy for the resampling pipeline.
//!
//! Only structural and configuration problems are errors. Per-row signal
//! anomalies and unresolvable grid seconds degrade into diagnostics or
//! empty records instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResampleError {
    #[error("rssi limit ({rssi_limit_ms} ms) must be greater than or equal to gap limit ({gap_limit_ms} ms)")]
    Config {
        gap_limit_ms: i64,
        rssi_limit_ms: i64,
    },

    #[error("{name} must not be negative, got {value}")]
    NegativeLimit { name: &'static str, value: i64 },

    #[error("required column '{0}' not found in input CSV")]
    MissingColumn(String),

    #[error("no records to process")]
    NoRecords,

    #[error("invalid {field} at line {line}: '{value}'")]
    InvalidField {
        field: &'static str,
        line: usize,
        value: String,
    },

    #[error("{} row(s) have sample_at_ms value of 0", .lines.len())]
    ZeroTimestamps { lines: Vec<usize> },

    #[error("invalid interval {interval}s: {reason}")]
    InvalidInterval { interval: i64, reason: String },

    #[error("{interval}s cannot evenly divide the total time span of {span}s (suggested: {suggestions:?})")]
    IntervalMismatch {
        interval: i64,
        span: i64,
        suggestions: Vec<i64>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResampleError>;
