use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::output::OutputRow;

/// Summary of one resampling run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub input_rows: usize,
    pub events: usize,
    pub dropped_rows: usize,
    pub signal_columns: usize,
    pub backward_lines: usize,

    // output
    pub resampled_points: usize,
    pub empty_records: usize,
    pub output_rows: usize,
    pub first_resample_at: Option<i64>,
    pub last_resample_at: Option<i64>,

    pub elapsed_ms: u128,
}

impl RunStats {
    pub fn new(input_rows: usize) -> Self {
        RunStats {
            started_at: Utc::now(),
            input_rows,
            ..Default::default()
        }
    }

    /// Fills the output counters from the formatted rows.
    pub fn with_output(mut self, rows: &[OutputRow]) -> Self {
        self.output_rows = rows.len();
        self.empty_records = rows.iter().filter(|r| r.empty).count();
        self.first_resample_at = rows.first().map(|r| r.resample_at);
        self.last_resample_at = rows.last().map(|r| r.resample_at);
        self
    }

    /// Share of output rows backed by real data, in percent.
    pub fn coverage_pct(&self) -> f64 {
        Self::pct(self.output_rows - self.empty_records, self.output_rows)
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }
}
