//! CLI entry point for the CVL resampling tool.
//!
//! Provides subcommands for resampling raw device telemetry onto a whole-day
//! 1 Hz grid and for aggregating resampled output into fixed intervals.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use cvl_resampler::analyzers::analyzer::analyze;
use cvl_resampler::config::{DEFAULT_GAP_LIMIT_MS, DEFAULT_RSSI_LIMIT_MS, ResampleConfig};
use cvl_resampler::{
    output::{print_json, print_pretty, read_table_file, write_rows_file},
    pipeline::process,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cvl_resampler")]
#[command(about = "RTLS CVL resampling tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample a device CSV onto a whole-day 1 Hz grid
    Resample {
        /// Input CSV file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output CSV file (defaults to `resampled_<input>` next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Largest counter gap to interpolate across, in milliseconds
        #[arg(long, env = "CVL_GAP_LIMIT_MS", default_value_t = DEFAULT_GAP_LIMIT_MS)]
        gap_limit: i64,

        /// Largest signal gap to interpolate or carry across, in milliseconds
        #[arg(long, env = "CVL_RSSI_LIMIT_MS", default_value_t = DEFAULT_RSSI_LIMIT_MS)]
        rssi_limit: i64,

        /// Report progress and per-row anomalies
        #[arg(short, long, env = "CVL_VERBOSE", default_value_t = false)]
        verbose: bool,

        /// Log the run summary as JSON
        #[arg(long, default_value_t = false)]
        summary_json: bool,
    },
    /// Aggregate a resampled CSV into fixed time intervals
    Aggregate {
        /// Resampled CSV file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Interval length in seconds
        #[arg(value_name = "INTERVAL")]
        interval: i64,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Require the interval to evenly divide the data's time span
        #[arg(long, default_value_t = false)]
        verify: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();
    let verbose = matches!(cli.command, Commands::Resample { verbose: true, .. });
    let _file_guard = init_tracing(verbose)?;

    info!("RTLS CVL Resampling Tool");

    match cli.command {
        Commands::Resample {
            input,
            output,
            gap_limit,
            rssi_limit,
            verbose,
            summary_json,
        } => {
            let config = ResampleConfig::new(gap_limit, rssi_limit).with_verbose(verbose);
            let output = output.unwrap_or_else(|| default_resample_output(&input));
            resample(&input, &output, config, summary_json)?;
        }
        Commands::Aggregate {
            input,
            interval,
            output,
            verify,
        } => {
            let output = output.unwrap_or_else(|| default_aggregate_output(&input, interval));
            let aggregates = analyze(&input, &output, interval, verify)
                .with_context(|| format!("failed to aggregate {}", input.display()))?;
            info!(
                aggregates = aggregates.len(),
                output = %output.display(),
                "Aggregated file written"
            );
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing(verbose: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/cvl_resampler.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("cvl_resampler.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_level = if verbose { "debug" } else { "info" };
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(stderr_level.parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Reads, resamples and writes one device file.
#[tracing::instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
fn resample(input: &Path, output: &Path, config: ResampleConfig, summary_json: bool) -> Result<()> {
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let table = read_table_file(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    info!(records = table.rows.len(), "Read input records");

    let resampled = process(&table, config)?;

    write_rows_file(output, &resampled.headers, &resampled.rows)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let stats = resampled.stats;
    print_pretty(&stats);
    if summary_json {
        print_json(&stats)?;
    }
    info!(
        rows = stats.output_rows,
        coverage_pct = stats.coverage_pct(),
        elapsed_ms = stats.elapsed_ms as u64,
        "Successfully processed data"
    );
    Ok(())
}

/// `resampled_<file name>` in the input's directory.
fn default_resample_output(input: &Path) -> PathBuf {
    let file_name = input
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.csv".to_string());
    input.with_file_name(format!("resampled_{file_name}"))
}

/// `aggregate_<stem>_<interval>sec_<timestamp>.csv` in the working directory.
fn default_aggregate_output(input: &Path, interval: i64) -> PathBuf {
    let stem = input
        .file_name()
        .and_then(|f| f.to_str())
        .and_then(|f| f.split('.').next())
        .unwrap_or("output");
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    PathBuf::from(format!("aggregate_{stem}_{interval}sec_{timestamp}.csv"))
}
