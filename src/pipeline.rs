//! Parser → engine → formatter over in-memory tabular data.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ResampleConfig;
use crate::engine::Resampler;
use crate::error::{ResampleError, Result};
use crate::output::{OutputRow, Table, format_points, output_headers};
use crate::parser::{ColumnMap, find_backward_lines, parse_events, validate_sample_times};
use crate::stats::RunStats;

/// Output table of one run plus its summary.
#[derive(Debug, Clone)]
pub struct Resampled {
    pub headers: Vec<String>,
    pub rows: Vec<OutputRow>,
    pub stats: RunStats,
}

/// Resamples one device's table onto a whole-day 1 Hz grid.
///
/// # Errors
///
/// Fails on invalid limits, missing required columns, empty input, zero
/// timestamps and unparsable mandatory fields. Everything else degrades
/// into warnings or empty records.
#[tracing::instrument(skip_all, fields(rows = table.rows.len()))]
pub fn process(table: &Table, config: ResampleConfig) -> Result<Resampled> {
    let started = Instant::now();
    config.validate()?;

    if table.rows.is_empty() {
        return Err(ResampleError::NoRecords);
    }
    let mut stats = RunStats::new(table.rows.len());

    let columns = ColumnMap::from_headers(&table.headers)?;
    validate_sample_times(&columns, &table.rows)?;

    let signal_columns = columns.signal_names();
    info!(signal_columns = signal_columns.len(), "Found signal columns");
    let resampler = Resampler::new(signal_columns.clone(), config)?;

    let events = parse_events(&columns, &table.rows)?;
    if events.is_empty() {
        return Err(ResampleError::NoRecords);
    }
    info!(events = events.len(), "Parsed events");

    let backward = find_backward_lines(&events);
    if !backward.is_empty() {
        warn!(
            count = backward.len(),
            "Found row(s) with backward sample_at_ms times"
        );
        for line in &backward {
            debug!(line, "Backward sample_at_ms");
        }
    }

    let points = resampler.resample(&events);
    if points.is_empty() {
        warn!("No grid second could be resolved; output will be empty");
    }
    info!(points = points.len(), "Generated resampled points");

    let rows = format_points(&points, &signal_columns);

    stats.events = events.len();
    stats.dropped_rows = table.rows.len() - events.len();
    stats.signal_columns = signal_columns.len();
    stats.backward_lines = backward.len();
    stats.resampled_points = points.len();
    let mut stats = stats.with_output(&rows);
    stats.elapsed_ms = started.elapsed().as_millis();

    Ok(Resampled {
        headers: output_headers(&signal_columns),
        rows,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::StringRecord;

    /// 2025-03-19 00:00:00 UTC in milliseconds
    const DAY_MS: i64 = 1_742_342_400_000;

    #[test]
    fn test_config_error_precedes_input_checks() {
        let table = Table::default();
        let err = process(&table, ResampleConfig::new(10_000, 5_000)).unwrap_err();
        assert!(matches!(err, ResampleError::Config { .. }));
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let table = Table {
            headers: header(),
            rows: vec![],
        };
        assert!(matches!(
            process(&table, ResampleConfig::default()),
            Err(ResampleError::NoRecords)
        ));
    }

    #[test]
    fn test_only_short_rows_is_rejected() {
        let table = Table {
            headers: header(),
            rows: vec![StringRecord::from(vec!["f", "band"])],
        };
        assert!(matches!(
            process(&table, ResampleConfig::default()),
            Err(ResampleError::NoRecords)
        ));
    }

    #[test]
    fn test_zero_timestamp_is_fatal() {
        let table = Table {
            headers: header(),
            rows: vec![row(0, 1, 10, "")],
        };
        assert!(matches!(
            process(&table, ResampleConfig::default()),
            Err(ResampleError::ZeroTimestamps { .. })
        ));
    }

    #[test]
    fn test_two_event_scenario() {
        let table = Table {
            headers: header(),
            rows: vec![
                row(DAY_MS + 3_600_000, 1, 10, "-60"),
                row(DAY_MS + 3_610_000, 2, 20, ""),
            ],
        };
        let out = process(&table, ResampleConfig::default()).unwrap();

        assert_eq!(out.rows.len(), 86_400);
        assert_eq!(out.stats.resampled_points, 11);
        assert_eq!(out.stats.empty_records, 86_400 - 11);
        assert_eq!(out.stats.backward_lines, 0);
        assert_eq!(out.headers.len(), 10);

        let mid = out.rows[3_605].to_record();
        assert_eq!(mid[7], "15.00");
        assert_eq!(mid[8], "1.00");
        assert_eq!(mid[9], "-60.00");

        let rise: f64 = out
            .rows
            .iter()
            .filter(|r| !r.empty)
            .map(|r| match r.increment {
                crate::output::Increment::Value(v) => v,
                crate::output::Increment::SegmentStart => 0.0,
            })
            .sum();
        assert!((rise - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_backward_rows_are_not_fatal() {
        let table = Table {
            headers: header(),
            rows: vec![
                row(DAY_MS + 5_000, 1, 10, ""),
                row(DAY_MS + 4_000, 2, 11, ""),
                row(DAY_MS + 9_000, 3, 12, ""),
            ],
        };
        let out = process(&table, ResampleConfig::default()).unwrap();
        assert_eq!(out.stats.backward_lines, 1);
        assert_eq!(out.rows.len(), 86_400);
    }

    // Helper functions for tests
    fn header() -> StringRecord {
        StringRecord::from(vec![
            "family_id",
            "device_name",
            "device_mac",
            "sample_at_ms",
            "event_seq",
            "acvl",
            "01_744DBD2A408C_rssi",
        ])
    }

    fn row(sample_at_ms: i64, seq: i64, acvl: i64, rssi: &str) -> StringRecord {
        StringRecord::from(vec![
            "family-1".to_string(),
            "band-01".to_string(),
            "AA:BB:CC:DD:EE:FF".to_string(),
            sample_at_ms.to_string(),
            seq.to_string(),
            acvl.to_string(),
            rssi.to_string(),
        ])
    }
}
