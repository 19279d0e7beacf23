use crate::analyzers::aggregate::aggregate_intervals;
use crate::analyzers::types::{
    IntervalAggregate, ResampledRecord, ResampledTable, aggregate_headers,
};
use crate::analyzers::utility::{validate_interval, verify_interval};
use crate::engine::DeviceIdentity;
use crate::error::{ResampleError, Result};
use crate::output::{Table, read_table_file};
use crate::parser::{DEVICE_MAC, DEVICE_NAME, FAMILY_ID, signal_columns};
use csv::{StringRecord, WriterBuilder};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

const RESAMPLE_AT: &str = "resample_at";
const RESAMPLE_AT_UTC: &str = "resample_at_utc";
const RESAMPLE_ACVL: &str = "resample_acvl";
const RESAMPLE_ACVL_INCREMENT: &str = "resample_acvl_increment";

/// Reads a resampled CSV, aggregates it into `interval`-second windows and
/// writes the result to `output`.
///
/// With `verify`, the interval must also evenly divide the file's time span.
#[tracing::instrument(skip_all, fields(input = %input.display(), interval))]
pub fn analyze(
    input: &Path,
    output: &Path,
    interval: i64,
    verify: bool,
) -> Result<Vec<IntervalAggregate>> {
    validate_interval(interval)?;

    let table = load_records(&read_table_file(input)?)?;
    info!(
        records = table.len(),
        signal_columns = table.signal_columns().len(),
        "Loaded resampled records"
    );

    if verify {
        verify_interval(interval, table.time_span())?;
    }

    let aggregates = aggregate_intervals(&table, interval);
    write_aggregates(File::create(output)?, table.signal_columns(), &aggregates)?;

    if !aggregates.is_empty() {
        info!(
            records = table.len(),
            aggregates = aggregates.len(),
            ratio = table.len() as f64 / aggregates.len() as f64,
            "Aggregation complete"
        );
    }
    Ok(aggregates)
}

/// Converts a raw resampled table into typed records.
///
/// Identity columns are optional and read as blank when absent; the
/// timestamp and counter columns are required.
pub fn load_records(table: &Table) -> Result<ResampledTable> {
    let index: HashMap<&str, usize> = table
        .headers
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
    let resample_at = required(RESAMPLE_AT)?;
    let resample_at_utc = required(RESAMPLE_AT_UTC)?;
    let resample_acvl = required(RESAMPLE_ACVL)?;
    let increment = required(RESAMPLE_ACVL_INCREMENT)?;

    let identity: Vec<Option<usize>> = [FAMILY_ID, DEVICE_NAME, DEVICE_MAC]
        .iter()
        .map(|name| {
            let idx = index.get(name).copied();
            if idx.is_none() {
                warn!(column = *name, "Identity column missing, using blank values");
            }
            idx
        })
        .collect();

    let signal_columns = signal_columns(&table.headers);
    let signal_idx: Vec<usize> = signal_columns
        .iter()
        .filter_map(|c| index.get(c.as_str()).copied())
        .collect();

    let mut records = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let line = i + 2;
        let field = |idx: Option<usize>| {
            idx.and_then(|idx| row.get(idx))
                .unwrap_or_default()
                .to_string()
        };

        records.push(ResampledRecord {
            device: DeviceIdentity {
                family_id: field(identity[0]),
                device_name: field(identity[1]),
                device_mac: field(identity[2]),
            },
            resample_at: number(row, resample_at, RESAMPLE_AT, line)?,
            resample_at_utc: field(Some(resample_at_utc)),
            resample_acvl: number(row, resample_acvl, RESAMPLE_ACVL, line)?,
            increment: optional_number(row, increment, RESAMPLE_ACVL_INCREMENT, line)?
                .unwrap_or(0.0),
            signals: signal_idx
                .iter()
                .map(|&idx| {
                    row.get(idx)
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .and_then(|v| v.parse().ok())
                })
                .collect(),
        });
    }

    Ok(ResampledTable {
        signal_columns,
        records,
    })
}

/// Writes the aggregate header followed by one row per interval.
pub fn write_aggregates<W: Write>(
    writer: W,
    signal_columns: &[String],
    aggregates: &[IntervalAggregate],
) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(aggregate_headers(signal_columns))?;
    for aggregate in aggregates {
        wtr.write_record(aggregate.to_record())?;
    }
    wtr.flush()?;
    Ok(())
}

fn number<T: std::str::FromStr>(
    row: &StringRecord,
    idx: usize,
    field: &'static str,
    line: usize,
) -> Result<T> {
    optional_number(row, idx, field, line)?.ok_or(ResampleError::InvalidField {
        field,
        line,
        value: String::new(),
    })
}

fn optional_number<T: std::str::FromStr>(
    row: &StringRecord,
    idx: usize,
    field: &'static str,
    line: usize,
) -> Result<Option<T>> {
    let raw = row.get(idx).unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| ResampleError::InvalidField {
        field,
        line,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{format_points, output_headers, write_rows_file};
    use crate::engine::ResampledPoint;
    use std::env;
    use std::fs;

    /// 2025-03-19 00:00:00 UTC
    const DAY: i64 = 1_742_342_400;

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_load_records_without_identity_columns() {
        let table = Table {
            headers: StringRecord::from(vec![
                "resample_at",
                "resample_at_utc",
                "resample_acvl",
                "resample_acvl_increment",
                "01_744DBD2A408C_rssi",
            ]),
            rows: vec![
                StringRecord::from(vec!["1742342400", "2025/03/19 00:00:00", "5.00", "-0.00", ""]),
                StringRecord::from(vec!["1742342401", "2025/03/19 00:00:01", "6.00", "1.00", "-61.00"]),
            ],
        };

        let loaded = load_records(&table).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.records[0].device.family_id, "");
        assert_eq!(loaded.records[0].signals, vec![None]);
        assert_eq!(loaded.records[1].signals, vec![Some(-61.0)]);
        assert_eq!(loaded.records[1].increment, 1.0);
        assert_eq!(loaded.time_span(), 2);
    }

    #[test]
    fn test_load_records_requires_counter_columns() {
        let table = Table {
            headers: StringRecord::from(vec!["resample_at", "resample_at_utc", "resample_acvl"]),
            rows: vec![],
        };
        let err = load_records(&table).unwrap_err();
        assert!(matches!(err, ResampleError::MissingColumn(ref c) if c == "resample_acvl_increment"));
    }

    #[test]
    fn test_load_records_rejects_bad_timestamp() {
        let table = Table {
            headers: StringRecord::from(vec![
                "resample_at",
                "resample_at_utc",
                "resample_acvl",
                "resample_acvl_increment",
            ]),
            rows: vec![StringRecord::from(vec!["soon", "", "1.00", "0.00"])],
        };
        let err = load_records(&table).unwrap_err();
        assert!(matches!(
            err,
            ResampleError::InvalidField {
                field: "resample_at",
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_analyze_resampled_day() {
        let input = temp_path("cvl_resampler_test_agg_in.csv");
        let output = temp_path("cvl_resampler_test_agg_out.csv");
        let _ = fs::remove_file(&input);
        let _ = fs::remove_file(&output);

        let signals = vec!["01_744DBD2A408C_rssi".to_string()];
        let points: Vec<ResampledPoint> = (0..120)
            .map(|s| ResampledPoint {
                resample_at: DAY + 3600 + s,
                device: DeviceIdentity {
                    family_id: "family-1".into(),
                    device_name: "band-01".into(),
                    device_mac: "AA:BB:CC:DD:EE:FF".into(),
                },
                event_seq: 1,
                attributed_acvl: 0,
                interpolated_acvl: s as f64,
                increment: if s == 0 { 0.0 } else { 1.0 },
                signals: [(signals[0].clone(), -60.0 - s as f64)].into_iter().collect(),
            })
            .collect();
        let rows = format_points(&points, &signals);
        write_rows_file(&input, &output_headers(&signals), &rows).unwrap();

        let aggregates = analyze(Path::new(&input), Path::new(&output), 3600, true).unwrap();
        assert_eq!(aggregates.len(), 24);
        assert_eq!(aggregates[1].start_time(), DAY + 3600);
        assert_eq!(aggregates[1].aggregate_acvl_increment(), 119.0);
        assert_eq!(aggregates[0].aggregate_acvl_increment(), 0.0);

        let written = fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 25);
        assert!(lines[0].starts_with("family_id,device_name,device_mac,aggregate_time_group"));
        assert!(lines[2].contains("MainBedroom"));
        assert!(lines[2].ends_with("-60.00"));

        fs::remove_file(&input).unwrap();
        fs::remove_file(&output).unwrap();
    }

    #[test]
    fn test_analyze_verify_rejects_uneven_span() {
        let input = temp_path("cvl_resampler_test_agg_verify.csv");
        let output = temp_path("cvl_resampler_test_agg_verify_out.csv");
        let _ = fs::remove_file(&input);

        fs::write(
            &input,
            "resample_at,resample_at_utc,resample_acvl,resample_acvl_increment\n\
             1742342400,2025/03/19 00:00:00,1.00,-0.00\n\
             1742342407,2025/03/19 00:00:07,1.00,0.00\n",
        )
        .unwrap();

        let err = analyze(Path::new(&input), Path::new(&output), 5, true).unwrap_err();
        assert!(matches!(err, ResampleError::IntervalMismatch { span: 8, .. }));

        fs::remove_file(&input).unwrap();
    }

    #[test]
    fn test_analyze_rejects_invalid_interval() {
        let err = analyze(Path::new("missing.csv"), Path::new("out.csv"), 7, false).unwrap_err();
        assert!(matches!(err, ResampleError::InvalidInterval { interval: 7, .. }));
    }
}
