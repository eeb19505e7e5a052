//! Report persistence.
//!
//! One JSON file per station and period, two-space indented. Rerunning with
//! the same parameters overwrites the earlier file.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::report::types::Report;
use crate::station::{StationId, ValidationPeriod};
use std::path::{Path, PathBuf};

/// Directory reports are written to unless told otherwise.
pub const DEFAULT_OUTPUT_DIR: &str = "stationvalidation_output";

/// `{snlc}.{label}.validation_results.json`, e.g.
/// `QW.BCV13...2022-07-23.validation_results.json`.
pub fn report_file_name(station: &StationId, period: &ValidationPeriod) -> String {
    format!(
        "{}.{}.validation_results.json",
        station.snlc(),
        period.label()
    )
}

/// Logs a report as pretty-printed JSON.
pub fn print_json(report: &Report) -> Result<()> {
    debug!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Writes `report` into `dir` under [`Report::file_name`], creating the
/// directory when absent, and returns the path written.
pub fn write_report(dir: impl AsRef<Path>, report: &Report) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = dir.join(report.file_name());
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    info!(path = %path.display(), passed = report.all_passed(), "Report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MetricVerdict;
    use crate::report::types::ChannelReport;
    use crate::soh::SohVerdicts;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 7, d).unwrap()
    }

    fn report() -> Report {
        let mut metrics = BTreeMap::new();
        metrics.insert("num_gaps".to_string(), MetricVerdict::pass([0.0]));
        let mut channels = BTreeMap::new();
        channels.insert("HNZ".to_string(), ChannelReport { metrics });
        channels.insert("HNN".to_string(), ChannelReport::default());
        Report {
            network_code: "QW".into(),
            station_code: "BCV13".into(),
            location_code: None,
            start_date: date(23),
            end_date: date(23),
            channels,
            timely_availability: Some(MetricVerdict::fail([97.0], "late")),
            soh: SohVerdicts {
                clock_offset: Some(MetricVerdict::pass([0.5])),
                ..Default::default()
            },
            file_name: "r.json".into(),
        }
    }

    #[test]
    fn test_one_day_file_name_uses_start_only() {
        let station = StationId::new("QW", "BCV13", None);
        let period = ValidationPeriod::new(date(23), date(24)).unwrap();
        let name = report_file_name(&station, &period);
        assert_eq!(name, "QW.BCV13...2022-07-23.validation_results.json");
        assert!(!name.contains("2022-07-24"));
    }

    #[test]
    fn test_multi_day_file_name_uses_last_day() {
        let station = StationId::new("QW", "BCV13", Some("00"));
        let period = ValidationPeriod::new(date(23), date(26)).unwrap();
        assert_eq!(
            report_file_name(&station, &period),
            "QW.BCV13.00..2022-07-23_2022-07-25.validation_results.json"
        );
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&report()).unwrap();
    }

    #[test]
    fn test_write_report_layout() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let path = write_report(&out, &report()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"network_code\": \"QW\""));
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["start_date"], "2022-07-23");
        assert_eq!(json["end_date"], "2022-07-23");
        assert!(json.get("location_code").is_none());
        assert_eq!(json["channels"]["HNN"]["metrics"], serde_json::json!({}));
        assert_eq!(json["channels"]["HNZ"]["metrics"]["num_gaps"]["passed"], true);
        assert_eq!(json["channels"]["HNZ"]["metrics"]["num_gaps"]["details"], "");
        assert_eq!(json["timely_availability"]["values"][0], 97.0);
        assert_eq!(json["clock_offset"]["passed"], true);
        assert!(json.get("clock_locked").is_none());
    }

    #[test]
    fn test_write_report_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        write_report(dir.path(), &report()).unwrap();
        let mut second = report();
        second.channels.clear();
        let path = write_report(dir.path(), &second).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["channels"], serde_json::json!({}));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
