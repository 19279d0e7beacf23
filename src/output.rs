//! Formatting, day padding and CSV persistence of resampled series.
//!
//! Every hole in the 1 Hz grid, including the partial day before the first
//! point and after the last one, is filled with an empty record so the
//! output always spans whole UTC days.

use chrono::{DateTime, NaiveTime, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::engine::{DeviceIdentity, ResampledPoint};
use crate::error::Result;
use crate::stats::RunStats;

/// Increment rendering for empty records and segment starts.
pub const SEGMENT_START_MARKER: &str = "-0.00";

/// Human-readable UTC timestamp layout.
pub const UTC_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Fixed leading columns of the resampled output.
pub const OUTPUT_COLUMNS: [&str; 9] = [
    "family_id",
    "device_name",
    "device_mac",
    "resample_at",
    "resample_at_utc",
    "event_seq",
    "acvl",
    "resample_acvl",
    "resample_acvl_increment",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Increment {
    Value(f64),
    /// First row after a hole, or an empty record.
    SegmentStart,
}

/// One output row, either a real resampled point or an empty record.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub device: DeviceIdentity,
    pub resample_at: i64,
    pub event_seq: i64,
    pub acvl: i64,
    pub resample_acvl: f64,
    pub increment: Increment,
    /// One entry per signal column, in output order.
    pub signals: Vec<Option<f64>>,
    pub empty: bool,
}

impl OutputRow {
    fn from_point(point: &ResampledPoint, signal_columns: &[String], increment: Increment) -> Self {
        Self {
            device: point.device.clone(),
            resample_at: point.resample_at,
            event_seq: point.event_seq,
            acvl: point.attributed_acvl,
            resample_acvl: point.interpolated_acvl,
            increment,
            signals: signal_columns
                .iter()
                .map(|name| point.signals.get(name).copied())
                .collect(),
            empty: false,
        }
    }

    /// An empty record at `resample_at` borrowing `reference`'s identity and counters.
    fn empty(reference: &ResampledPoint, resample_at: i64, signal_count: usize) -> Self {
        Self {
            device: reference.device.clone(),
            resample_at,
            event_seq: reference.event_seq,
            acvl: reference.attributed_acvl,
            resample_acvl: reference.interpolated_acvl,
            increment: Increment::SegmentStart,
            signals: vec![None; signal_count],
            empty: true,
        }
    }

    /// Renders the row in output column order.
    pub fn to_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(OUTPUT_COLUMNS.len() + self.signals.len());
        record.push(self.device.family_id.clone());
        record.push(self.device.device_name.clone());
        record.push(self.device.device_mac.clone());
        record.push(self.resample_at.to_string());
        record.push(format_utc(self.resample_at));
        record.push(self.event_seq.to_string());
        record.push(self.acvl.to_string());
        record.push(format!("{:.2}", self.resample_acvl));
        record.push(match self.increment {
            Increment::Value(v) => format!("{v:.2}"),
            Increment::SegmentStart => SEGMENT_START_MARKER.to_string(),
        });
        record.extend(
            self.signals
                .iter()
                .map(|s| s.map(|v| format!("{v:.2}")).unwrap_or_default()),
        );
        record
    }
}

/// Output header row: fixed columns followed by the signal columns.
pub fn output_headers(signal_columns: &[String]) -> Vec<String> {
    OUTPUT_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(signal_columns.iter().cloned())
        .collect()
}

/// Formats `seconds` since the epoch as a UTC string, empty if out of range.
pub fn format_utc(seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|dt| dt.format(UTC_FORMAT).to_string())
        .unwrap_or_default()
}

/// First second (00:00:00 UTC) of the day containing `seconds`.
pub fn day_start(seconds: i64) -> i64 {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .map(|dt| dt.date_naive().and_time(NaiveTime::MIN).and_utc().timestamp())
        .unwrap_or(seconds)
}

/// Last second (23:59:59 UTC) of the day containing `seconds`.
pub fn day_end(seconds: i64) -> i64 {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .and_then(|dt| dt.date_naive().and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(seconds)
}

/// Converts resampled points into gap-free output rows covering whole days.
///
/// Points must be in ascending grid order, as produced by the engine.
#[tracing::instrument(skip_all, fields(points = points.len()))]
pub fn format_points(points: &[ResampledPoint], signal_columns: &[String]) -> Vec<OutputRow> {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    let width = signal_columns.len();
    let mut rows = Vec::new();

    let start = day_start(first.resample_at);
    debug!(count = first.resample_at - start, "Padding from start of day");
    rows.extend((start..first.resample_at).map(|t| OutputRow::empty(first, t, width)));

    let total = points.len();
    let mut previous: Option<i64> = None;

    for (i, point) in points.iter().enumerate() {
        if total > 100 && i % (total / 10) == 0 {
            debug!(
                point = i,
                total,
                percent = (i * 100 / total) as u64,
                "Formatting points"
            );
        }

        let increment = match previous {
            Some(prev) if point.resample_at != prev + 1 => {
                rows.extend((prev + 1..point.resample_at).map(|t| OutputRow::empty(point, t, width)));
                Increment::SegmentStart
            }
            _ => Increment::Value(point.increment),
        };

        rows.push(OutputRow::from_point(point, signal_columns, increment));
        previous = Some(point.resample_at);
    }

    let end = day_end(last.resample_at);
    debug!(count = end - last.resample_at, "Padding to end of day");
    rows.extend((last.resample_at + 1..=end).map(|t| OutputRow::empty(last, t, width)));

    rows
}

/// Header and rows of an input table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

/// Reads a CSV table. Rows may have any number of fields.
pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Table { headers, rows })
}

pub fn read_table_file(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Reading CSV table");
    read_table(File::open(path)?)
}

/// Writes `headers` followed by every row.
pub fn write_rows<W: Write>(writer: W, headers: &[String], rows: &[OutputRow]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(row.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Creates (or truncates) `path` and writes the resampled table to it.
pub fn write_rows_file(path: impl AsRef<Path>, headers: &[String], rows: &[OutputRow]) -> Result<()> {
    let path = path.as_ref();
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");
    write_rows(File::create(path)?, headers, rows)
}

/// Logs run statistics using Rust's debug pretty-print format.
pub fn print_pretty(stats: &RunStats) {
    debug!("{:#?}", stats);
}

/// Logs run statistics as pretty-printed JSON.
pub fn print_json(stats: &RunStats) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::fs;

    /// 2025-03-19 00:00:00 UTC
    const DAY: i64 = 1_742_342_400;
    const SECONDS_PER_DAY: i64 = 86_400;
    const STATION: &str = "01_744DBD2A408C_rssi";

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_day_bounds() {
        let t = DAY + 14 * 3600 + 17;
        assert_eq!(day_start(t), DAY);
        assert_eq!(day_end(t), DAY + SECONDS_PER_DAY - 1);
        assert_eq!(day_start(DAY), DAY);
        assert_eq!(day_end(DAY - 1), DAY - 1);
    }

    #[test]
    fn test_format_utc() {
        assert_eq!(format_utc(DAY + 14 * 3600 + 5), "2025/03/19 14:00:05");
    }

    #[test]
    fn test_single_point_fills_whole_day() {
        let at = DAY + 14 * 3600;
        let rows = format_points(&[point(at, 0.0, &[])], &signals());

        assert_eq!(rows.len(), SECONDS_PER_DAY as usize);
        assert_eq!(rows[0].resample_at, DAY);
        assert_eq!(rows.last().unwrap().resample_at, DAY + SECONDS_PER_DAY - 1);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.resample_at, DAY + i as i64);
            assert_eq!(row.empty, row.resample_at != at);
        }

        let real = &rows[(at - DAY) as usize];
        assert_eq!(real.increment, Increment::Value(0.0));
        assert_eq!(rows[0].increment, Increment::SegmentStart);
    }

    #[test]
    fn test_internal_hole_is_padded() {
        let points = vec![
            point(DAY + 10, 0.0, &[]),
            point(DAY + 11, 1.0, &[]),
            point(DAY + 15, 0.0, &[]),
            point(DAY + 16, 2.5, &[]),
        ];
        let rows = format_points(&points, &signals());
        let at = |t: i64| &rows[(t - DAY) as usize];

        assert_eq!(at(DAY + 11).increment, Increment::Value(1.0));
        for t in DAY + 12..DAY + 15 {
            assert!(at(t).empty);
            assert_eq!(at(t).event_seq, 15);
        }
        assert!(!at(DAY + 15).empty);
        assert_eq!(at(DAY + 15).increment, Increment::SegmentStart);
        assert_eq!(at(DAY + 16).increment, Increment::Value(2.5));
        assert_eq!(at(DAY + 17).event_seq, 16);
    }

    #[test]
    fn test_multi_day_output_is_contiguous() {
        let points = vec![point(DAY + 100, 0.0, &[]), point(DAY + SECONDS_PER_DAY + 5, 0.0, &[])];
        let rows = format_points(&points, &signals());

        assert_eq!(rows.len(), 2 * SECONDS_PER_DAY as usize);
        for pair in rows.windows(2) {
            assert_eq!(pair[1].resample_at, pair[0].resample_at + 1);
        }
    }

    #[test]
    fn test_no_points_no_rows() {
        assert!(format_points(&[], &signals()).is_empty());
    }

    #[test]
    fn test_record_rendering() {
        let p = point(DAY + 1, 1.234, &[(STATION, -61.456)]);
        let rows = format_points(&[point(DAY, 0.0, &[]), p], &signals());

        assert_eq!(
            rows[1].to_record(),
            vec![
                "family-1",
                "band-01",
                "AA:BB:CC:DD:EE:FF",
                "1742342401",
                "2025/03/19 00:00:01",
                "1",
                "7",
                "7.50",
                "1.23",
                "-61.46",
                "",
            ]
        );

        let empty = rows[2].to_record();
        assert_eq!(empty[8], SEGMENT_START_MARKER);
        assert_eq!(empty[9], "");
        assert_eq!(empty[10], "");
    }

    #[test]
    fn test_output_headers() {
        let headers = output_headers(&signals());
        assert_eq!(headers.len(), 11);
        assert_eq!(headers[0], "family_id");
        assert_eq!(headers[8], "resample_acvl_increment");
        assert_eq!(headers[9], STATION);
    }

    #[test]
    fn test_write_and_read_back() {
        let path = temp_path("cvl_resampler_test_output.csv");
        let _ = fs::remove_file(&path);

        let rows = format_points(&[point(DAY + 5, 0.0, &[(STATION, -70.0)])], &signals());
        write_rows_file(&path, &output_headers(&signals()), &rows).unwrap();

        let table = read_table_file(&path).unwrap();
        assert_eq!(table.headers.len(), 11);
        assert_eq!(table.rows.len(), SECONDS_PER_DAY as usize);
        assert_eq!(table.rows[5].get(9), Some("-70.00"));
        assert_eq!(table.rows[4].get(8), Some("-0.00"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&RunStats::default());
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&RunStats::default()).unwrap();
    }

    // Helper functions for tests
    fn signals() -> Vec<String> {
        vec![STATION.to_string(), "04_744DBD2A4090_rssi".to_string()]
    }

    fn point(resample_at: i64, increment: f64, rssi: &[(&str, f64)]) -> ResampledPoint {
        ResampledPoint {
            resample_at,
            device: DeviceIdentity {
                family_id: "family-1".into(),
                device_name: "band-01".into(),
                device_mac: "AA:BB:CC:DD:EE:FF".into(),
            },
            event_seq: resample_at - DAY,
            attributed_acvl: 7,
            interpolated_acvl: 7.5,
            increment,
            signals: rssi
                .iter()
                .map(|&(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
        }
    }
}
