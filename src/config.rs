//! Resampling limits shared by the engine and the CLI.

use serde::{Deserialize, Serialize};

use crate::error::{ResampleError, Result};

pub const DEFAULT_GAP_LIMIT_MS: i64 = 30_000;
pub const DEFAULT_RSSI_LIMIT_MS: i64 = 30_000;

/// Tolerances for bridging holes in the counter and signal series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Largest distance between two counter events that may still be interpolated.
    pub gap_limit_ms: i64,
    /// Largest distance a signal sample may be carried or interpolated over.
    pub rssi_limit_ms: i64,
    /// Progress diagnostics only.
    pub verbose: bool,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            gap_limit_ms: DEFAULT_GAP_LIMIT_MS,
            rssi_limit_ms: DEFAULT_RSSI_LIMIT_MS,
            verbose: false,
        }
    }
}

impl ResampleConfig {
    pub fn new(gap_limit_ms: i64, rssi_limit_ms: i64) -> Self {
        Self {
            gap_limit_ms,
            rssi_limit_ms,
            ..Default::default()
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Rejects negative limits and a signal limit below the gap limit.
    pub fn validate(&self) -> Result<()> {
        if self.gap_limit_ms < 0 {
            return Err(ResampleError::NegativeLimit {
                name: "gap limit",
                value: self.gap_limit_ms,
            });
        }
        if self.rssi_limit_ms < 0 {
            return Err(ResampleError::NegativeLimit {
                name: "rssi limit",
                value: self.rssi_limit_ms,
            });
        }
        if self.rssi_limit_ms < self.gap_limit_ms {
            return Err(ResampleError::Config {
                gap_limit_ms: self.gap_limit_ms,
                rssi_limit_ms: self.rssi_limit_ms,
            });
        }
        Ok(())
    }
}
