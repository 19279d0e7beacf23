use std::collections::BTreeMap;

use crate::analyzers::rooms::{parse_station_column, room_type_name};
use crate::analyzers::types::{IntervalAggregate, ResampledRecord, ResampledTable, Station};
use crate::analyzers::utility::max_present;
use crate::output::UTC_FORMAT;
use chrono::{DateTime, Utc};

const DASHED_UTC_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Aggregates resampled rows into fixed windows of `interval` seconds.
///
/// Windows are aligned to the epoch, so intervals that divide a minute line
/// up with minute boundaries. Per window the first and last counter values,
/// the summed increment and the per-signal maximum are kept, along with the
/// station that saw the strongest signal.
pub fn aggregate_intervals(table: &ResampledTable, interval: i64) -> Vec<IntervalAggregate> {
    if table.records.is_empty() || interval <= 0 {
        return Vec::new();
    }

    let utc_format = match table.records.first() {
        Some(r) if !r.resample_at_utc.contains('/') => DASHED_UTC_FORMAT,
        _ => UTC_FORMAT,
    };

    let mut groups: BTreeMap<i64, Vec<&ResampledRecord>> = BTreeMap::new();
    for record in &table.records {
        groups
            .entry(record.resample_at.div_euclid(interval))
            .or_default()
            .push(record);
    }

    let mut aggregates: Vec<IntervalAggregate> = groups
        .into_iter()
        .filter_map(|(key, rows)| {
            aggregate_group(key, &rows, interval, &table.signal_columns, utc_format)
        })
        .collect();

    aggregates.sort_by_key(|a| a.start_time);
    aggregates
}

fn aggregate_group(
    key: i64,
    rows: &[&ResampledRecord],
    interval: i64,
    signal_columns: &[String],
    utc_format: &str,
) -> Option<IntervalAggregate> {
    let first = rows.first()?;
    let last = rows.last()?;

    let signal_max: Vec<Option<f64>> = (0..signal_columns.len())
        .map(|i| max_present(rows.iter().map(|r| r.signals.get(i).copied().flatten())))
        .collect();

    Some(IntervalAggregate {
        device: first.device.clone(),
        time_group: time_group(key, first.resample_at, interval),
        interval_seconds: interval,
        start_time: first.resample_at,
        end_time: last.resample_at,
        aggregate_at: last.resample_at,
        start_time_utc: first.resample_at_utc.clone(),
        end_time_utc: last.resample_at_utc.clone(),
        aggregate_at_utc: DateTime::<Utc>::from_timestamp(last.resample_at, 0)
            .map(|dt| dt.format(utc_format).to_string())
            .unwrap_or_default(),
        start_acvl: first.resample_acvl,
        end_acvl: last.resample_acvl,
        // `+ 0.0` folds the empty-row `-0.00` markers into a plain zero
        aggregate_acvl_increment: rows.iter().map(|r| r.increment).sum::<f64>() + 0.0,
        strongest: strongest_station(signal_columns, &signal_max),
        signal_max,
    })
}

/// Window label: `<minute start>_<slot>` for sub-minute windows, the window
/// index otherwise.
fn time_group(key: i64, resample_at: i64, interval: i64) -> String {
    if interval <= 60 {
        let seconds_in_minute = resample_at.rem_euclid(60);
        let minute = resample_at - seconds_in_minute;
        format!("{}_{}", minute, seconds_in_minute / interval)
    } else {
        key.to_string()
    }
}

/// The signal column with the highest maximum; the first wins on ties.
fn strongest_station(signal_columns: &[String], signal_max: &[Option<f64>]) -> Option<Station> {
    let mut best: Option<(usize, f64)> = None;
    for (i, value) in signal_max.iter().enumerate() {
        if let Some(v) = *value {
            if best.is_none_or(|(_, b)| v > b) {
                best = Some((i, v));
            }
        }
    }

    let (idx, _) = best?;
    let (room, mac) = parse_station_column(signal_columns.get(idx)?)?;
    Some(Station {
        room_type_id: room.to_string(),
        room_type_name: room_type_name(room),
        mac: mac.to_string(),
    })
}
