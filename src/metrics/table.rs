//! In-memory table of per-channel statistical metric values.

use crate::error::{Result, StationError};
use crate::station::parse_timestamp;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

/// Columns every metric source must carry.
const REQUIRED_COLUMNS: &[&str] = &["metricName", "value", "target", "start"];

/// One observation of one metric for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub metric_name: String,
    /// Start of the measurement window.
    pub start: DateTime<Utc>,
    pub value: f64,
}

/// A row as written by ISPAQ, before the target is decomposed.
#[derive(Debug, Deserialize)]
struct SourceRecord {
    #[serde(rename = "metricName")]
    metric_name: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    value: Option<f64>,
    target: String,
    start: String,
}

/// The decomposed `NET.STA.LOC.CHA.Q` target field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub quality: String,
}

impl Target {
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.trim().split('.').collect();
        match parts.as_slice() {
            [network, station, location, channel, quality]
                if !network.is_empty() && !station.is_empty() && !channel.is_empty() =>
            {
                Ok(Target {
                    network: network.to_string(),
                    station: station.to_string(),
                    location: location.to_string(),
                    channel: channel.to_string(),
                    quality: quality.to_string(),
                })
            }
            _ => Err(StationError::MalformedTarget {
                target: raw.to_string(),
            }),
        }
    }
}

/// Filter for [`MetricTable::values`]. Unset dimensions match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricQuery<'a> {
    metric: &'a str,
    network: Option<&'a str>,
    station: Option<&'a str>,
    location: Option<&'a str>,
    channel: Option<&'a str>,
}

impl<'a> MetricQuery<'a> {
    pub fn metric(metric: &'a str) -> Self {
        Self {
            metric,
            ..Default::default()
        }
    }

    pub fn network(mut self, network: &'a str) -> Self {
        self.network = Some(network);
        self
    }

    pub fn station(mut self, station: &'a str) -> Self {
        self.station = Some(station);
        self
    }

    /// `Some("")` selects rows with an empty location code.
    pub fn location(mut self, location: Option<&'a str>) -> Self {
        self.location = location;
        self
    }

    pub fn channel(mut self, channel: &'a str) -> Self {
        self.channel = Some(channel);
        self
    }

    fn matches(&self, row: &MetricRow) -> bool {
        row.metric_name == self.metric
            && self.network.is_none_or(|n| row.network == n)
            && self.station.is_none_or(|s| row.station == s)
            && self.location.is_none_or(|l| row.location == l)
            && self.channel.is_none_or(|c| row.channel == c)
    }
}

/// Append-only collection of [`MetricRow`]s fed by one or more sources.
///
/// Duplicate keys from overlapping sources are all retained. Rows are kept
/// in ingestion order, which is the order [`MetricTable::values`] returns.
#[derive(Debug, Default)]
pub struct MetricTable {
    rows: Vec<MetricRow>,
    sources: usize,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one ISPAQ CSV file. Returns the number of rows kept.
    pub fn ingest_path(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        self.ingest(&path.display().to_string(), file)
    }

    /// Ingests a CSV source with `metricName,value,target,start[,end]`
    /// columns. Rows without a usable value are dropped.
    ///
    /// A malformed target aborts the whole source; nothing from it is kept.
    pub fn ingest<R: Read>(&mut self, source_name: &str, reader: R) -> Result<usize> {
        let mut rdr = csv::Reader::from_reader(reader);

        let headers = rdr.headers()?.clone();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !headers.iter().any(|h| h == **c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(StationError::MissingColumns {
                source_name: source_name.to_string(),
                columns: missing,
            });
        }

        let mut parsed = Vec::new();
        for result in rdr.deserialize() {
            let record: SourceRecord = result?;
            let target = Target::parse(&record.target)?;
            let Some(value) = record.value else {
                continue;
            };
            let start =
                parse_timestamp(&record.start).ok_or_else(|| StationError::InvalidTimestamp {
                    source_name: source_name.to_string(),
                    value: record.start.clone(),
                })?;

            parsed.push(MetricRow {
                network: target.network,
                station: target.station,
                location: target.location,
                channel: target.channel,
                metric_name: record.metric_name,
                start,
                value,
            });
        }

        let kept = parsed.len();
        self.rows.extend(parsed);
        self.sources += 1;
        Ok(kept)
    }

    /// Number of sources ingested so far.
    pub fn source_count(&self) -> usize {
        self.sources
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.sources == 0 {
            Err(StationError::DataNotLoaded)
        } else {
            Ok(())
        }
    }

    /// Channel codes recorded for a station. Empty is a valid answer.
    pub fn channels(&self, network: &str, station: &str) -> Result<BTreeSet<String>> {
        self.ensure_loaded()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| r.network == network && r.station == station)
            .map(|r| r.channel.clone())
            .collect())
    }

    /// Channel codes recorded for a station at one location code.
    pub fn channels_at(
        &self,
        network: &str,
        station: &str,
        location: &str,
    ) -> Result<BTreeSet<String>> {
        self.ensure_loaded()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| r.network == network && r.station == station && r.location == location)
            .map(|r| r.channel.clone())
            .collect())
    }

    /// Names of every metric with at least one non-null value.
    pub fn metric_names(&self) -> Result<BTreeSet<String>> {
        self.ensure_loaded()?;
        Ok(self.rows.iter().map(|r| r.metric_name.clone()).collect())
    }

    /// Values matching `query` with the day each row starts on, in
    /// ingestion order. No match is an empty vector, not an error.
    pub fn values(&self, query: &MetricQuery<'_>) -> Result<Vec<(NaiveDate, f64)>> {
        self.ensure_loaded()?;
        Ok(self
            .rows
            .iter()
            .filter(|r| query.matches(r))
            .map(|r| (r.start.date_naive(), r.value))
            .collect())
    }
}
