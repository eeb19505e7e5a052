use crate::error::StationError;
use crate::metrics::table::MetricTable;
use crate::station::ValidationPeriod;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The three CSV outputs ISPAQ writes for one metrics group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSources {
    pub simple: PathBuf,
    pub psd: PathBuf,
    pub sample_rate: PathBuf,
}

impl MetricSources {
    /// Derives `{dir}/csv/{alias}_{snlc}_{label}_{kind}.csv` for each kind.
    ///
    /// `snlc` is the station selector ISPAQ was run with, e.g.
    /// `QW.BCV13.x.Hxx`.
    pub fn locate(output_dir: &Path, alias: &str, snlc: &str, period: &ValidationPeriod) -> Self {
        let csv_dir = output_dir.join("csv");
        let name = |kind: &str| csv_dir.join(format!("{alias}_{snlc}_{}_{kind}.csv", period.label()));
        Self {
            simple: name("simpleMetrics"),
            psd: name("PSDMetrics"),
            sample_rate: name("sampleRateMetrics"),
        }
    }
}

/// Builds a [`MetricTable`] from whichever of `sources` exist on disk.
///
/// Missing files are skipped. Fails when no metric survives ingestion.
#[tracing::instrument(skip_all, fields(alias = %alias))]
pub fn load_metric_table(sources: &MetricSources, alias: &str) -> Result<MetricTable> {
    let mut table = MetricTable::new();

    for (path, kind) in [(&sources.simple, "basicStats"), (&sources.psd, "psd_derived")] {
        if path.exists() {
            let kept = table
                .ingest_path(path)
                .with_context(|| format!("Failed to ingest {}", path.display()))?;
            info!(path = %path.display(), rows = kept, "Metric source ingested");
        } else {
            warn!(
                path = %path.display(),
                "{kind} metrics not found. Check that they are specified in the ISPAQ preference file under {alias}"
            );
        }
    }

    if sources.sample_rate.exists() {
        let kept = table
            .ingest_path(&sources.sample_rate)
            .with_context(|| format!("Failed to ingest {}", sources.sample_rate.display()))?;
        info!(path = %sources.sample_rate.display(), rows = kept, "Metric source ingested");
    } else {
        debug!(path = %sources.sample_rate.display(), "No sample rate metrics");
    }

    match table.metric_names() {
        Ok(names) if !names.is_empty() => Ok(table),
        _ => Err(StationError::NoMetricsFound.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn period(days: u64) -> ValidationPeriod {
        let start = NaiveDate::from_ymd_opt(2022, 7, 23).unwrap();
        ValidationPeriod::new(start, start + chrono::Days::new(days)).unwrap()
    }

    #[test]
    fn test_locate_single_day() {
        let s = MetricSources::locate(Path::new("out"), "eew_test", "QW.BCV13.x.Hxx", &period(1));
        assert_eq!(
            s.simple,
            Path::new("out/csv/eew_test_QW.BCV13.x.Hxx_2022-07-23_simpleMetrics.csv")
        );
        assert_eq!(
            s.sample_rate,
            Path::new("out/csv/eew_test_QW.BCV13.x.Hxx_2022-07-23_sampleRateMetrics.csv")
        );
    }

    #[test]
    fn test_locate_multi_day() {
        let s = MetricSources::locate(Path::new("out"), "eew_test", "QW.BCV13.x.Hxx", &period(2));
        assert_eq!(
            s.psd,
            Path::new("out/csv/eew_test_QW.BCV13.x.Hxx_2022-07-23_2022-07-24_PSDMetrics.csv")
        );
    }

    #[test]
    fn test_no_sources_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let s = MetricSources::locate(dir.path(), "eew_test", "QW.BCV13.x.Hxx", &period(1));
        let err = load_metric_table(&s, "eew_test").unwrap_err();
        let station_err = err.downcast_ref::<StationError>().unwrap();
        assert!(matches!(station_err, StationError::NoMetricsFound));
    }

    #[test]
    fn test_only_null_values_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let s = MetricSources::locate(dir.path(), "eew_test", "QW.BCV13.x.Hxx", &period(1));
        fs::create_dir_all(dir.path().join("csv")).unwrap();
        fs::write(
            &s.simple,
            "metricName,value,target,start,end\nnum_gaps,,QW.BCV13..HNZ.D,2022-07-23,2022-07-24\n",
        )
        .unwrap();
        assert!(load_metric_table(&s, "eew_test").is_err());
    }

    #[test]
    fn test_missing_psd_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let s = MetricSources::locate(dir.path(), "eew_test", "QW.BCV13.x.Hxx", &period(1));
        fs::create_dir_all(dir.path().join("csv")).unwrap();
        fs::write(
            &s.simple,
            "metricName,value,target,start,end\nnum_gaps,0,QW.BCV13..HNZ.D,2022-07-23,2022-07-24\n",
        )
        .unwrap();
        let table = load_metric_table(&s, "eew_test").unwrap();
        assert_eq!(table.source_count(), 1);
        assert_eq!(table.len(), 1);
    }
}
