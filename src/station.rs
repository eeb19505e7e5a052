//! Station identity and validation period.

use crate::error::{Result, StationError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Network, station and optional location code of the station under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationId {
    pub network: String,
    pub station: String,
    pub location: Option<String>,
}

impl StationId {
    pub fn new(network: &str, station: &str, location: Option<&str>) -> Self {
        Self {
            network: network.to_string(),
            station: station.to_string(),
            location: location.filter(|l| !l.is_empty()).map(str::to_string),
        }
    }

    /// Prefix used in report file names: `NET.STA..` or `NET.STA.LOC.`.
    pub fn snlc(&self) -> String {
        format!(
            "{}.{}.{}.",
            self.network,
            self.station,
            self.location.as_deref().unwrap_or("")
        )
    }

    /// Location code as it appears inside SOH records (empty when unset).
    pub fn location_code(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }
}

/// Inclusive start, exclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl ValidationPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(StationError::InvalidPeriod(
                "end date must be after start date".into(),
            ));
        }
        if start == end {
            return Err(StationError::InvalidPeriod(
                "end date is not inclusive. To test for one day, set the end date to the day after the start date".into(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// The final day covered by the period (`end - 1 day`).
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.end)
    }

    pub fn is_single_day(&self) -> bool {
        self.start == self.last_day()
    }

    /// `START` for one-day runs, `START_LASTDAY` otherwise.
    pub fn label(&self) -> String {
        if self.is_single_day() {
            self.start.format("%Y-%m-%d").to_string()
        } else {
            format!(
                "{}_{}",
                self.start.format("%Y-%m-%d"),
                self.last_day().format("%Y-%m-%d")
            )
        }
    }
}

/// Parses the timestamp formats found in ISPAQ, latency and SOH exports:
/// RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (with `T` or space) read as
/// UTC, and bare dates read as midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw.trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
