//! Parsed SOH telemetry consumed by the family evaluators.

use crate::error::{Result, StationError};
use crate::station::parse_timestamp;
use chrono::NaiveDate;
use regex::Regex;
use regex::bytes::Regex as BytesRegex;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Header bytes left on each record after the sentinel split.
const RECORD_HEADER_LEN: usize = 46;
/// Bytes of the following record's header carried at the end of each chunk.
const RECORD_TRAILER_LEN: usize = 8;

/// One day of samples from one SOH channel.
#[derive(Debug, Clone, PartialEq)]
pub struct SohSeries {
    pub channel: String,
    pub day: NaiveDate,
    /// File or stream the samples came from.
    pub source: String,
    pub samples: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    channel: String,
    start: String,
    source: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    value: Option<f64>,
}

/// Reads SOH channel samples with `channel,start,source,value` columns,
/// grouped by channel, day and source in first-seen order.
pub fn read_soh_series<R: Read>(source_name: &str, reader: R) -> Result<Vec<SohSeries>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut series: Vec<SohSeries> = Vec::new();

    for result in rdr.deserialize() {
        let row: SampleRow = result?;
        let Some(value) = row.value else {
            continue;
        };
        let day = parse_timestamp(&row.start)
            .ok_or_else(|| StationError::InvalidTimestamp {
                source_name: source_name.to_string(),
                value: row.start.clone(),
            })?
            .date_naive();

        match series
            .iter_mut()
            .find(|s| s.channel == row.channel && s.day == day && s.source == row.source)
        {
            Some(existing) => existing.samples.push(value),
            None => series.push(SohSeries {
                channel: row.channel,
                day,
                source: row.source,
                samples: vec![value],
            }),
        }
    }

    Ok(series)
}

pub fn load_soh_series(path: impl AsRef<Path>) -> Result<Vec<SohSeries>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    read_soh_series(&path.display().to_string(), file)
}

/// GNSS readings from one day of all-in-one instrument SOH.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailySohLog {
    /// File name without directories.
    pub file: String,
    pub satellites_used: Vec<u32>,
    pub clock_quality: Vec<String>,
    pub clock_lock_status: Vec<String>,
}

impl DailySohLog {
    /// Reads and parses a daily SOH file for `station` / `location`.
    pub fn read(path: impl AsRef<Path>, station: &str, location: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let text = decode_soh_records(&content, station, location);
        Self::from_text(&file, &text)
    }

    /// Extracts every `GNSS status` … `PTP status` block of decoded text.
    pub fn from_text(file: &str, text: &str) -> Result<Self> {
        let block = Regex::new(r"(?s)GNSS status(.*?)PTP status")
            .map_err(|e| StationError::soh_parse(file, e.to_string()))?;

        let mut log = DailySohLog {
            file: file.to_string(),
            ..Default::default()
        };

        for captures in block.captures_iter(text) {
            let Some(body) = captures.get(1) else {
                continue;
            };
            for line in body.as_str().lines() {
                let line = line.trim();
                if let Some(raw) = field(line, "Satellites used") {
                    let count = raw.parse::<u32>().map_err(|_| {
                        StationError::soh_parse(file, format!("bad satellite count '{raw}'"))
                    })?;
                    log.satellites_used.push(count);
                }
                if let Some(raw) = field(line, "Clock quality") {
                    log.clock_quality.push(raw.to_string());
                }
                if let Some(raw) = field(line, "Status") {
                    log.clock_lock_status.push(raw.to_string());
                }
            }
        }

        Ok(log)
    }
}

/// Value after `label:` on a line that mentions `label`.
fn field<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    if !line.contains(label) {
        return None;
    }
    line.split_once(&format!("{label}:"))
        .map(|(_, value)| value.trim())
}

/// Joins the text payloads of an all-in-one SOH file.
///
/// Records are split on the `{STATION}{LOCATION}SOH` sentinel; each chunk
/// keeps the bytes between its remaining fixed header and the start of the
/// next record's header.
pub fn decode_soh_records(content: &[u8], station: &str, location: &str) -> String {
    let sentinel = format!("{}{}SOH", station.to_uppercase(), location.to_uppercase());
    let Ok(splitter) = BytesRegex::new(&regex::escape(&sentinel)) else {
        return String::new();
    };

    let payload: Vec<u8> = splitter
        .split(content)
        .filter(|chunk| chunk.len() > RECORD_HEADER_LEN + RECORD_TRAILER_LEN)
        .flat_map(|chunk| &chunk[RECORD_HEADER_LEN..chunk.len() - RECORD_TRAILER_LEN])
        .copied()
        .collect();

    String::from_utf8_lossy(&payload).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_TEXT: &str = "\
GNSS status
  Satellites used: 8
  Clock quality: Fine locked
  Status: Locked
PTP status
  Status: Disabled
GNSS status
  Satellites used: 5
  Clock quality: Coarse locked
  Status: Unlocked
PTP status
";

    fn record(payload: &str) -> Vec<u8> {
        let mut r = b"000001D ".to_vec();
        r.extend_from_slice(b"QCN0800SOH");
        r.extend_from_slice(&[b'h'; RECORD_HEADER_LEN]);
        r.extend_from_slice(payload.as_bytes());
        r
    }

    #[test]
    fn test_from_text_extracts_gnss_blocks_only() {
        let log = DailySohLog::from_text("QW.QCN08.00.SOH.2022.204", DAY_TEXT).unwrap();
        assert_eq!(log.satellites_used, vec![8, 5]);
        assert_eq!(log.clock_quality, vec!["Fine locked", "Coarse locked"]);
        // PTP "Status: Disabled" lines sit outside the GNSS blocks.
        assert_eq!(log.clock_lock_status, vec!["Locked", "Unlocked"]);
    }

    #[test]
    fn test_bad_satellite_count_is_a_parse_error() {
        let text = "GNSS status\nSatellites used: many\nPTP status";
        let err = DailySohLog::from_text("f", text).unwrap_err();
        assert!(matches!(err, StationError::SohParse { .. }));
    }

    #[test]
    fn test_decode_strips_headers_and_trailers() {
        let (first, second) = DAY_TEXT.split_at(60);
        let mut bytes = record(first);
        bytes.extend(record(second));
        bytes.extend_from_slice(b"        ");

        let text = decode_soh_records(&bytes, "qcn08", "00");
        assert_eq!(text, DAY_TEXT);
        let log = DailySohLog::from_text("f", &text).unwrap();
        assert_eq!(log.satellites_used, vec![8, 5]);
    }

    #[test]
    fn test_read_soh_series_groups_by_day_and_source() {
        let csv = "\
channel,start,source,value
LCE,2022-07-23T00:00:00Z,QW.BCV13..LCE.2022.204,1
LCE,2022-07-23T00:10:00Z,QW.BCV13..LCE.2022.204,2
GST,2022-07-23T00:00:00Z,QW.BCV13..GST.2022.204,1
LCE,2022-07-24T00:00:00Z,QW.BCV13..LCE.2022.205,3
LCE,2022-07-24T00:10:00Z,QW.BCV13..LCE.2022.205,
";
        let series = read_soh_series("samples", csv.as_bytes()).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].channel, "LCE");
        assert_eq!(series[0].samples, vec![1.0, 2.0]);
        assert_eq!(series[2].day, NaiveDate::from_ymd_opt(2022, 7, 24).unwrap());
        assert_eq!(series[2].samples, vec![3.0]);
    }
}
