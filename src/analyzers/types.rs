//! Data types used by the interval aggregation pipeline.

use crate::engine::DeviceIdentity;

/// A single row read back from a resampled CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledRecord {
    pub(crate) device: DeviceIdentity,
    pub(crate) resample_at: i64,
    pub(crate) resample_at_utc: String,
    pub(crate) resample_acvl: f64,
    pub(crate) increment: f64,
    /// One entry per signal column, in header order.
    pub(crate) signals: Vec<Option<f64>>,
}

/// Rows of one resampled file together with its signal column names.
#[derive(Debug, Clone, Default)]
pub struct ResampledTable {
    pub(crate) signal_columns: Vec<String>,
    pub(crate) records: Vec<ResampledRecord>,
}

impl ResampledTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn signal_columns(&self) -> &[String] {
        &self.signal_columns
    }

    /// Seconds covered from the earliest to the latest row, inclusive.
    pub fn time_span(&self) -> i64 {
        let min = self.records.iter().map(|r| r.resample_at).min();
        let max = self.records.iter().map(|r| r.resample_at).max();
        match (min, max) {
            (Some(min), Some(max)) => max - min + 1,
            _ => 0,
        }
    }
}

/// The station that reported the strongest signal within an interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    pub(crate) room_type_id: String,
    pub(crate) room_type_name: &'static str,
    pub(crate) mac: String,
}

/// Aggregated statistics for one time interval.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalAggregate {
    pub(crate) device: DeviceIdentity,
    pub(crate) time_group: String,
    pub(crate) interval_seconds: i64,
    pub(crate) start_time: i64,
    pub(crate) end_time: i64,
    pub(crate) aggregate_at: i64,
    pub(crate) start_time_utc: String,
    pub(crate) end_time_utc: String,
    pub(crate) aggregate_at_utc: String,
    pub(crate) start_acvl: f64,
    pub(crate) end_acvl: f64,
    pub(crate) aggregate_acvl_increment: f64,
    pub(crate) strongest: Option<Station>,
    /// Per-signal maximum, in header order.
    pub(crate) signal_max: Vec<Option<f64>>,
}

pub const AGGREGATE_COLUMNS: [&str; 17] = [
    "family_id",
    "device_name",
    "device_mac",
    "aggregate_time_group",
    "interval_seconds",
    "start_time",
    "end_time",
    "aggregate_at",
    "start_time_utc",
    "end_time_utc",
    "aggregate_at_utc",
    "start_acvl",
    "end_acvl",
    "aggregate_acvl_increment",
    "max_rssi_room_type_id",
    "max_rssi_room_type_name",
    "max_rssi_station",
];

impl IntervalAggregate {
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    pub fn aggregate_acvl_increment(&self) -> f64 {
        self.aggregate_acvl_increment
    }

    /// Renders the aggregate in output column order.
    pub fn to_record(&self) -> Vec<String> {
        let (room_id, room_name, mac) = match &self.strongest {
            Some(s) => (s.room_type_id.clone(), s.room_type_name.to_string(), s.mac.clone()),
            None => Default::default(),
        };

        let mut record = vec![
            self.device.family_id.clone(),
            self.device.device_name.clone(),
            self.device.device_mac.clone(),
            self.time_group.clone(),
            self.interval_seconds.to_string(),
            self.start_time.to_string(),
            self.end_time.to_string(),
            self.aggregate_at.to_string(),
            self.start_time_utc.clone(),
            self.end_time_utc.clone(),
            self.aggregate_at_utc.clone(),
            format!("{:.2}", self.start_acvl),
            format!("{:.2}", self.end_acvl),
            format!("{:.2}", self.aggregate_acvl_increment),
            room_id,
            room_name,
            mac,
        ];
        record.extend(
            self.signal_max
                .iter()
                .map(|v| v.map(|v| format!("{v:.2}")).unwrap_or_default()),
        );
        record
    }
}

/// Output header row: fixed columns followed by the signal columns.
pub fn aggregate_headers(signal_columns: &[String]) -> Vec<String> {
    AGGREGATE_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(signal_columns.iter().cloned())
        .collect()
}
