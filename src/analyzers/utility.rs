use crate::error::{ResampleError, Result};

/// Intervals offered when a requested one does not divide the data span.
pub const COMMON_INTERVALS: [i64; 18] = [
    1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30, 60, 120, 300, 600, 900, 1800, 3600,
];

/// Checks that an interval aligns with minute boundaries.
///
/// Intervals up to a minute must divide 60; longer ones must be a multiple
/// of 30 seconds.
pub fn validate_interval(interval: i64) -> Result<()> {
    let reason = if interval <= 0 {
        "interval must be a positive integer"
    } else if interval <= 60 && 60 % interval != 0 {
        "intervals up to 60 seconds must evenly divide 60"
    } else if interval > 60 && interval % 30 != 0 {
        "intervals above 60 seconds must be a multiple of 30"
    } else {
        return Ok(());
    };

    Err(ResampleError::InvalidInterval {
        interval,
        reason: reason.to_string(),
    })
}

/// Common intervals that evenly divide `span` seconds.
pub fn suggest_intervals(span: i64) -> Vec<i64> {
    COMMON_INTERVALS
        .iter()
        .copied()
        .filter(|i| span % i == 0)
        .collect()
}

/// Fails if `interval` does not evenly divide `span`.
pub fn verify_interval(interval: i64, span: i64) -> Result<()> {
    if span % interval == 0 {
        return Ok(());
    }
    Err(ResampleError::IntervalMismatch {
        interval,
        span,
        suggestions: suggest_intervals(span),
    })
}

/// Largest present value, `None` when every entry is missing.
pub fn max_present(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    values
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}
