//! CLI entry point for station validation.
//!
//! Provides subcommands for generating a station's validation report from
//! ISPAQ, latency and SOH outputs, and for uploading results to S3.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use clap::{Args, Parser, Subcommand};
use station_validation::config::ThresholdSet;
use station_validation::latency::{LatencySeries, combine_daily, load_latency_file};
use station_validation::metrics::{MetricSources, load_metric_table};
use station_validation::report::{
    DEFAULT_OUTPUT_DIR, ReportInputs, build_report, print_json, write_report,
};
use station_validation::soh::records::load_soh_series;
use station_validation::soh::{
    DailySohLog, InstrumentType, PlotRequest, Plotter, SohInputs, TimingSource,
};
use station_validation::station::{StationId, ValidationPeriod};
use station_validation::upload::{S3Store, upload_directory};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "station_validation")]
#[command(about = "Validate a seismic station's data quality and state of health", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate ISPAQ metrics, latency and SOH data and write the report
    Report(ReportArgs),
    /// Upload a directory of results to S3
    Upload {
        /// Directory to upload
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        dir: PathBuf,

        /// S3 bucket name (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: String,

        /// Key prefix inside the bucket
        #[arg(long, default_value = "")]
        s3_prefix: String,

        /// Gzip compress files before uploading
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[derive(Args)]
struct ReportArgs {
    /// Network code (e.g., "QW")
    #[arg(short, long)]
    network: String,

    /// Station code (e.g., "BCV13")
    #[arg(short, long)]
    station: String,

    /// Location code, when the station has one
    #[arg(short, long)]
    location: Option<String>,

    /// First day of the validation period (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,

    /// Day after the last validated day; defaults to the day after start
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Directory ISPAQ wrote its csv folder to
    #[arg(long, default_value = "ispaq_outputs")]
    ispaq_output_dir: PathBuf,

    /// Metrics group alias from the ISPAQ preference file
    #[arg(short, long, default_value = "eew_test")]
    metrics: String,

    /// Station selector ISPAQ was run with; defaults to NET.STA.x.Hxx
    #[arg(long)]
    ispaq_selector: Option<String>,

    /// Daily latency CSV files
    #[arg(long = "latency")]
    latency_files: Vec<PathBuf>,

    /// Instrument type: titansma or fortimus
    #[arg(short, long)]
    instrument: Option<InstrumentType>,

    /// Timing source of all-in-one instruments: GNSS or PTP
    #[arg(long)]
    timing_source: Option<TimingSource>,

    /// SOH channel sample CSV files
    #[arg(long = "soh-samples")]
    soh_sample_files: Vec<PathBuf>,

    /// Daily SOH logs of all-in-one instruments
    #[arg(long = "soh-log")]
    soh_logs: Vec<PathBuf>,

    /// Threshold JSON file; falls back to $STATION_THRESHOLDS
    #[arg(short, long)]
    thresholds: Option<PathBuf>,

    /// Directory to write the report to
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Optional: S3 bucket to upload the output directory to
    #[arg(long)]
    s3_bucket: Option<String>,

    /// Key prefix inside the bucket
    #[arg(long, default_value = "")]
    s3_prefix: String,

    /// Optional: Gzip compress files before uploading to S3
    #[arg(long, default_value_t = false)]
    gzip: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/station_validation.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("station_validation.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

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

    let cli = Cli::parse();

    match cli.command {
        Commands::Report(args) => {
            let output_dir = args.output_dir.clone();
            let upload = args.s3_bucket.clone().map(|b| (b, args.s3_prefix.clone(), args.gzip));

            run_report(args)?;

            match upload {
                Some((bucket, prefix, gzip)) => {
                    let store = S3Store::from_env().await;
                    upload_directory(&store, &bucket, &prefix, &output_dir, gzip).await?;
                }
                None => info!("S3 bucket not specified, skipping upload"),
            }
        }
        Commands::Upload {
            dir,
            s3_bucket,
            s3_prefix,
            gzip,
        } => {
            let store = S3Store::from_env().await;
            upload_directory(&store, &s3_bucket, &s3_prefix, &dir, gzip).await?;
        }
    }

    Ok(())
}

/// Records plot requests. Rendering is done by a separate tool.
struct LogPlotter;

impl Plotter for LogPlotter {
    fn plot(&self, request: &PlotRequest) -> Result<()> {
        match request {
            PlotRequest::TimingError {
                clock_locked,
                clock_offset,
                threshold,
            } => info!(
                lock_days = clock_locked.len(),
                offset_days = clock_offset.len(),
                threshold,
                "Timing error plot requested"
            ),
            PlotRequest::ClockOffset {
                series,
                threshold_us,
            } => info!(days = series.len(), threshold_us, "Clock offset plot requested"),
        }
        Ok(())
    }
}

fn load_thresholds(path: Option<PathBuf>) -> Result<ThresholdSet> {
    let path = path.or_else(|| std::env::var_os("STATION_THRESHOLDS").map(PathBuf::from));
    match path {
        Some(path) => ThresholdSet::load(&path)
            .with_context(|| format!("Failed to load thresholds from {}", path.display())),
        None => {
            warn!("No threshold file given, using built-in defaults");
            Ok(ThresholdSet::new())
        }
    }
}

/// Loads every latency file that parses. Unreadable days are logged and
/// left out.
fn load_latency(files: &[PathBuf]) -> Option<LatencySeries> {
    if files.is_empty() {
        return None;
    }
    let days = files.iter().filter_map(|path| match load_latency_file(path) {
        Ok(records) => Some(records),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read latency file");
            None
        }
    });
    Some(combine_daily(days))
}

fn load_soh(args: &ReportArgs, station: &StationId) -> SohInputs {
    let mut inputs = SohInputs {
        timing_source: args.timing_source.unwrap_or_default(),
        ..Default::default()
    };

    for path in &args.soh_sample_files {
        match load_soh_series(path) {
            Ok(series) => inputs.series.extend(series),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping SOH samples"),
        }
    }
    for path in &args.soh_logs {
        match DailySohLog::read(path, &station.station, station.location_code()) {
            Ok(log) => inputs.logs.push(log),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping SOH log"),
        }
    }

    inputs
}

/// Builds and writes the report for one station.
#[tracing::instrument(
    skip_all,
    fields(network = %args.network, station = %args.station, start = %args.start)
)]
fn run_report(args: ReportArgs) -> Result<()> {
    let end = match args.end {
        Some(end) => end,
        None => args
            .start
            .checked_add_days(Days::new(1))
            .context("Start date out of range")?,
    };
    let period = ValidationPeriod::new(args.start, end)?;
    let station = StationId::new(&args.network, &args.station, args.location.as_deref());
    let thresholds = load_thresholds(args.thresholds.clone())?;

    let selector = args.ispaq_selector.clone().unwrap_or_else(|| {
        format!(
            "{}.{}.{}.Hxx",
            station.network,
            station.station,
            station.location.as_deref().unwrap_or("x")
        )
    });
    let sources = MetricSources::locate(&args.ispaq_output_dir, &args.metrics, &selector, &period);
    let table = load_metric_table(&sources, &args.metrics)?;

    let latency = load_latency(&args.latency_files);
    let soh = load_soh(&args, &station);

    let inputs = ReportInputs {
        station: &station,
        period: &period,
        table: &table,
        latency: latency.as_ref(),
        thresholds: &thresholds,
        instrument: args.instrument,
        soh: &soh,
    };
    let report = build_report(&inputs, &LogPlotter)?;
    print_json(&report)?;
    write_report(&args.output_dir, &report)?;

    Ok(())
}
