//! Record parser: turns raw CSV rows into typed [`Event`]s.
//!
//! Mandatory fields fail the whole run; signal readings are optional and
//! silently skipped when empty or unparsable.

use csv::StringRecord;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

use crate::engine::{DeviceIdentity, Event};
use crate::error::{ResampleError, Result};

/// Suffix marking a column as a signal reading.
pub const RSSI_SUFFIX: &str = "_rssi";

pub const FAMILY_ID: &str = "family_id";
pub const DEVICE_NAME: &str = "device_name";
pub const DEVICE_MAC: &str = "device_mac";
pub const SAMPLE_AT_MS: &str = "sample_at_ms";
pub const EVENT_SEQ: &str = "event_seq";
pub const ACVL: &str = "acvl";

/// CSV lines are 1-based and the header occupies line 1.
const FIRST_DATA_LINE: usize = 2;

/// Returns the signal columns of `headers`, in header order.
pub fn signal_columns(headers: &StringRecord) -> Vec<String> {
    headers
        .iter()
        .map(str::trim)
        .filter(|h| h.len() > RSSI_SUFFIX.len() && h.ends_with(RSSI_SUFFIX))
        .map(str::to_string)
        .collect()
}

/// Positions of the columns the parser reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    pub family_id: usize,
    pub device_name: usize,
    pub device_mac: usize,
    pub sample_at_ms: usize,
    pub event_seq: usize,
    pub acvl: usize,
    /// Signal column names and their positions, in header order.
    pub signals: Vec<(String, usize)>,
    /// Rows with fewer fields than this are dropped.
    pub width: usize,
}

impl ColumnMap {
    /// Builds the map from a header row.
    ///
    /// # Errors
    ///
    /// Returns [`ResampleError::MissingColumn`] for the first required column
    /// that is absent.
    pub fn from_headers(headers: &StringRecord) -> Result<Self> {
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim(), i))
            .collect();

        let required = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| ResampleError::MissingColumn(name.to_string()))
        };

        let signals = signal_columns(headers)
            .into_iter()
            .filter_map(|name| index.get(name.as_str()).map(|&i| (name, i)))
            .collect();

        Ok(Self {
            family_id: required(FAMILY_ID)?,
            device_name: required(DEVICE_NAME)?,
            device_mac: required(DEVICE_MAC)?,
            sample_at_ms: required(SAMPLE_AT_MS)?,
            event_seq: required(EVENT_SEQ)?,
            acvl: required(ACVL)?,
            signals,
            width: headers.len(),
        })
    }

    pub fn signal_names(&self) -> Vec<String> {
        self.signals.iter().map(|(name, _)| name.clone()).collect()
    }
}

/// Fails if any row carries a literal zero `sample_at_ms`.
///
/// All offending lines are collected before failing. Short rows are
/// ignored here and dropped later by [`parse_events`].
pub fn validate_sample_times(columns: &ColumnMap, rows: &[StringRecord]) -> Result<()> {
    let lines: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.len() >= columns.width)
        .filter(|(_, row)| row.get(columns.sample_at_ms).map(str::trim) == Some("0"))
        .map(|(i, _)| i + FIRST_DATA_LINE)
        .collect();

    if lines.is_empty() {
        return Ok(());
    }

    for line in &lines {
        debug!(line, "sample_at_ms is 0");
    }
    Err(ResampleError::ZeroTimestamps { lines })
}

/// Parses raw rows into events, dropping rows shorter than the header.
///
/// # Errors
///
/// Returns [`ResampleError::NoRecords`] when `rows` is empty and
/// [`ResampleError::InvalidField`] with the CSV line number when a mandatory
/// field cannot be parsed.
pub fn parse_events(columns: &ColumnMap, rows: &[StringRecord]) -> Result<Vec<Event>> {
    if rows.is_empty() {
        return Err(ResampleError::NoRecords);
    }

    let mut events = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let line = i + FIRST_DATA_LINE;
        if row.len() < columns.width {
            debug!(line, fields = row.len(), "Skipping short row");
            continue;
        }

        let sample_at_ms = mandatory(row, columns.sample_at_ms, SAMPLE_AT_MS, line)?;
        let event_seq = mandatory(row, columns.event_seq, EVENT_SEQ, line)?;
        let acvl = mandatory(row, columns.acvl, ACVL, line)?;

        let rssi = columns
            .signals
            .iter()
            .filter_map(|(name, idx)| {
                let raw = row.get(*idx)?.trim();
                if raw.is_empty() {
                    return None;
                }
                raw.parse::<f64>().ok().map(|v| (name.clone(), v))
            })
            .collect();

        events.push(Event {
            line,
            device: DeviceIdentity {
                family_id: text(row, columns.family_id),
                device_name: text(row, columns.device_name),
                device_mac: text(row, columns.device_mac),
            },
            sample_at_ms,
            event_seq,
            acvl,
            rssi,
        });
    }

    Ok(events)
}

/// Lines whose timestamp runs backwards relative to the previous event.
pub fn find_backward_lines(events: &[Event]) -> Vec<usize> {
    let mut lines = Vec::new();
    let mut last: Option<i64> = None;

    for event in events {
        if let Some(prev) = last {
            if prev > 0 && event.sample_at_ms < prev {
                lines.push(event.line);
            }
        }
        last = Some(event.sample_at_ms);
    }

    lines
}

fn mandatory<T: FromStr>(row: &StringRecord, idx: usize, field: &'static str, line: usize) -> Result<T> {
    let raw = row.get(idx).unwrap_or_default().trim();
    raw.parse().map_err(|_| ResampleError::InvalidField {
        field,
        line,
        value: raw.to_string(),
    })
}

fn text(row: &StringRecord, idx: usize) -> String {
    row.get(idx).unwrap_or_default().to_string()
}
