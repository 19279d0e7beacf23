//! Data types flowing through the resampling engine.

use serde::Serialize;
use std::collections::HashMap;

pub const MS_PER_SECOND: i64 = 1000;

/// Owner and device a sample belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub family_id: String,
    pub device_name: String,
    pub device_mac: String,
}

/// One observed telemetry sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// CSV line the event was parsed from (header is line 1).
    pub line: usize,
    pub device: DeviceIdentity,
    pub sample_at_ms: i64,
    pub event_seq: i64,
    pub acvl: i64,
    /// Sparse signal readings keyed by column name.
    pub rssi: HashMap<String, f64>,
}

/// One sample on the 1-second output grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledPoint {
    /// Grid timestamp in seconds.
    pub resample_at: i64,
    pub device: DeviceIdentity,
    /// Sequence number of the event this point is attributed to.
    pub event_seq: i64,
    /// Raw counter value of the attributed event.
    pub attributed_acvl: i64,
    /// Counter value interpolated onto the grid.
    pub interpolated_acvl: f64,
    /// Rise since the previous contiguous point, zero at segment start.
    pub increment: f64,
    /// Resolved signal values; a missing key means no valid value.
    pub signals: HashMap<String, f64>,
}

/// Rounds to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
