//! Data-latency aggregation and the timeliness verdict.
//!
//! Latency collection produces one CSV per day with
//! `network,station,channel,timestamp,latency` columns (latency in
//! seconds). The days are merged into one [`LatencySeries`] before the
//! verdict is computed.

use crate::config::ThresholdSet;
use crate::error::{Result, StationError};
use crate::evaluator::MetricVerdict;
use crate::evaluator::utility::{pct, round2};
use crate::station::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// One latency sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencyRecord {
    pub network: String,
    pub station: String,
    pub channel: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds between sample time and arrival.
    pub latency: f64,
}

#[derive(Debug, Deserialize)]
struct LatencyCsvRow {
    network: String,
    station: String,
    channel: String,
    timestamp: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    latency: Option<f64>,
}

/// Reads one day of latency records. Rows without a latency are skipped.
pub fn read_latency_records<R: Read>(source_name: &str, reader: R) -> Result<Vec<LatencyRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in rdr.deserialize() {
        let row: LatencyCsvRow = result?;
        let Some(latency) = row.latency else {
            continue;
        };
        let timestamp =
            parse_timestamp(&row.timestamp).ok_or_else(|| StationError::InvalidTimestamp {
                source_name: source_name.to_string(),
                value: row.timestamp.clone(),
            })?;
        records.push(LatencyRecord {
            network: row.network,
            station: row.station,
            channel: row.channel,
            timestamp,
            latency,
        });
    }

    Ok(records)
}

pub fn load_latency_file(path: impl AsRef<Path>) -> Result<Vec<LatencyRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    read_latency_records(&path.display().to_string(), file)
}

/// All latency samples of a validation period, in day order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencySeries {
    records: Vec<LatencyRecord>,
}

impl LatencySeries {
    pub fn records(&self) -> &[LatencyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Concatenates per-day collections into one series.
pub fn combine_daily(days: impl IntoIterator<Item = Vec<LatencyRecord>>) -> LatencySeries {
    LatencySeries {
        records: days.into_iter().flatten().collect(),
    }
}

/// Timeliness of a station's data: the share of samples that arrived within
/// `data_timeliness` seconds, compared with `timely_data_percentage`.
///
/// Fails with [`StationError::NoLatencyData`] when the series holds nothing
/// for the station; callers treat that as a skipped section.
pub fn evaluate_timeliness(
    series: &LatencySeries,
    network: &str,
    station: &str,
    thresholds: &ThresholdSet,
) -> Result<MetricVerdict> {
    let timely_threshold = thresholds.number("data_timeliness");
    let required_percent = thresholds.number("timely_data_percentage");

    let latencies: Vec<f64> = series
        .records
        .iter()
        .filter(|r| r.network == network && r.station == station)
        .map(|r| r.latency)
        .collect();

    if latencies.is_empty() {
        return Err(StationError::NoLatencyData);
    }

    let timely = latencies.iter().filter(|&&l| l <= timely_threshold).count();
    let exact = pct(timely, latencies.len());
    let percent = round2(exact);

    let failure = (exact < required_percent).then(|| {
        format!(
            "{percent}% of data arrived within {timely_threshold} seconds, below the required {required_percent}%"
        )
    });

    Ok(MetricVerdict::from_failure([percent], failure))
}
