//! SOH validation for all-in-one instruments, whose GNSS readings arrive as
//! one composite log per day and whose clock offset arrives as raw counts
//! on a separate channel.
//!
//! Every sample of the period is checked. The verdict names the first
//! offending file (or day, for the clock offset) in chronological order;
//! later offenders do not replace it.

use crate::config::ThresholdSet;
use crate::error::StationError;
use crate::evaluator::utility::{max_abs, round2};
use crate::evaluator::{MetricVerdict, Observation};
use crate::soh::{DailySohLog, PlotRequest, SohFamily, SohInputs, SohOutcome, SohVerdicts};

/// Nanoseconds per raw clock offset count.
pub const CLOCK_OFFSET_CALIBRATION: f64 = 24.112654;

/// Converts raw clock offset counts to microseconds.
pub fn counts_to_microseconds(counts: f64) -> f64 {
    counts * CLOCK_OFFSET_CALIBRATION / 1000.0
}

pub struct AllInOne;

/// Scans `logs` in order; the first file holding a sample for which
/// `offends` is true is named in the failure.
fn first_offending_file<'a, T: 'a>(
    logs: &'a [DailySohLog],
    samples: impl Fn(&'a DailySohLog) -> &'a [T],
    offends: impl Fn(&T) -> bool,
) -> Option<&'a str> {
    logs.iter()
        .find(|log| samples(*log).iter().any(&offends))
        .map(|log| log.file.as_str())
}

pub fn validate_satellites(logs: &[DailySohLog], threshold: f64) -> MetricVerdict {
    let values: Vec<Observation> = logs
        .iter()
        .flat_map(|l| l.satellites_used.iter().map(|&n| Observation::from(n)))
        .collect();
    let failure = first_offending_file(
        logs,
        |l| l.satellites_used.as_slice(),
        |&n| (n as f64) < threshold,
    )
    .map(|file| format!("Number of satellites was below the threshold of {threshold}. Check file {file}"));
    MetricVerdict::from_failure(values, failure)
}

/// Fails on any clock quality other than `expected`.
pub fn validate_clock_quality(logs: &[DailySohLog], expected: &str) -> MetricVerdict {
    validate_state(logs, |l| l.clock_quality.as_slice(), expected)
}

/// Fails on any lock status other than `expected`.
pub fn validate_clock_locked(logs: &[DailySohLog], expected: &str) -> MetricVerdict {
    validate_state(logs, |l| l.clock_lock_status.as_slice(), expected)
}

fn validate_state(
    logs: &[DailySohLog],
    samples: impl Fn(&DailySohLog) -> &[String],
    expected: &str,
) -> MetricVerdict {
    let values: Vec<Observation> = logs
        .iter()
        .flat_map(|l| samples(l).iter().map(|s| Observation::from(s.as_str())))
        .collect();
    let failure = logs
        .iter()
        .find(|l| samples(*l).iter().any(|s| s != expected))
        .map(|l| format!("Clock is not {expected}. Check file {}", l.file));
    MetricVerdict::from_failure(values, failure)
}

/// Judges each day's largest calibrated offset; reaching the threshold
/// fails.
pub fn validate_clock_offset(
    daily_counts: &[(chrono::NaiveDate, &[f64])],
    threshold_us: f64,
) -> MetricVerdict {
    let daily: Vec<(chrono::NaiveDate, f64)> = daily_counts
        .iter()
        .filter_map(|(day, counts)| {
            let micros: Vec<f64> = counts.iter().map(|&c| counts_to_microseconds(c)).collect();
            max_abs(&micros).map(|m| (*day, m))
        })
        .collect();

    let failure = daily
        .iter()
        .find(|(_, max)| *max >= threshold_us)
        .map(|(day, _)| {
            format!("The clock offset was above the threshold of {threshold_us} microseconds on {day}")
        });

    MetricVerdict::from_failure(daily.iter().map(|(_, max)| round2(*max)), failure)
}

impl SohFamily for AllInOne {
    fn evaluate(&self, inputs: &SohInputs, thresholds: &ThresholdSet) -> SohOutcome {
        let mut skipped = Vec::new();
        let mut plots = Vec::new();
        let mut verdicts = SohVerdicts::default();

        if inputs.logs.is_empty() {
            skipped.push(StationError::missing_soh("SOH"));
        } else {
            verdicts.satellites_locked = Some(validate_satellites(
                &inputs.logs,
                thresholds.number("satellites_locked"),
            ));
            verdicts.timing_quality = Some(validate_clock_quality(
                &inputs.logs,
                &thresholds.text("clock_quality_state"),
            ));
            verdicts.clock_locked = Some(validate_clock_locked(
                &inputs.logs,
                &thresholds.text("clock_lock_state"),
            ));
        }

        let channel = inputs.timing_source.clock_offset_channel();
        let series = inputs.channel(channel);
        if series.iter().all(|s| s.samples.is_empty()) {
            skipped.push(StationError::missing_soh(channel));
        } else {
            let threshold_us = thresholds.number("fine_clock_offset_us");
            let daily: Vec<_> = series.iter().map(|s| (s.day, s.samples.as_slice())).collect();
            verdicts.clock_offset = Some(validate_clock_offset(&daily, threshold_us));
            plots.push(PlotRequest::ClockOffset {
                series: series.into_iter().cloned().collect(),
                threshold_us,
            });
        }

        SohOutcome {
            verdicts,
            skipped,
            plots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soh::{SohSeries, TimingSource};
    use chrono::NaiveDate;

    fn log(file: &str, satellites: &[u32], quality: &[&str], status: &[&str]) -> DailySohLog {
        DailySohLog {
            file: file.into(),
            satellites_used: satellites.to_vec(),
            clock_quality: quality.iter().map(|s| s.to_string()).collect(),
            clock_lock_status: status.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 7, d).unwrap()
    }

    #[test]
    fn test_satellites_below_threshold_names_file() {
        let logs = vec![log("QW.QCN08.00.SOH.2022.204", &[8, 7, 5, 9], &[], &[])];
        let v = validate_satellites(&logs, 6.0);
        assert!(!v.passed());
        assert_eq!(
            v.details(),
            "Number of satellites was below the threshold of 6. Check file QW.QCN08.00.SOH.2022.204"
        );
        assert_eq!(v.values().len(), 4);
    }

    #[test]
    fn test_satellites_above_threshold_pass() {
        let logs = vec![log("QW.QCN08.00.SOH.2022.204", &[8, 7, 9], &[], &[])];
        let v = validate_satellites(&logs, 6.0);
        assert!(v.passed());
        assert!(v.details().is_empty());
    }

    #[test]
    fn test_first_failing_file_wins() {
        let logs = vec![
            log("day1", &[8], &["Fine locked"], &["Locked"]),
            log("day2", &[3], &["Coarse locked"], &["Unlocked"]),
            log("day3", &[2], &["Unlocked"], &["Unlocked"]),
        ];
        assert!(validate_satellites(&logs, 6.0).details().ends_with("day2"));
        let q = validate_clock_quality(&logs, "Fine locked");
        assert_eq!(q.details(), "Clock is not Fine locked. Check file day2");
        let l = validate_clock_locked(&logs, "Locked");
        assert_eq!(l.details(), "Clock is not Locked. Check file day2");
        assert_eq!(l.values().len(), 3);
    }

    #[test]
    fn test_calibration() {
        let us = counts_to_microseconds(4149.0);
        assert!((us - 100.04).abs() < 0.01);
    }

    #[test]
    fn test_offset_marginally_above_threshold_fails() {
        let counts = [10.0, -4149.0, 3.0];
        let v = validate_clock_offset(&[(day(23), &counts[..])], 100.0);
        assert!(!v.passed());
        assert_eq!(
            v.details(),
            "The clock offset was above the threshold of 100 microseconds on 2022-07-23"
        );
        assert_eq!(v.values(), &[Observation::Number(100.04)]);
    }

    #[test]
    fn test_offset_reports_first_failing_day() {
        let ok = [100.0];
        let bad = [5000.0];
        let v = validate_clock_offset(
            &[(day(23), &ok[..]), (day(24), &bad[..]), (day(25), &bad[..])],
            100.0,
        );
        assert!(v.details().ends_with("2022-07-24"));
        assert_eq!(v.values().len(), 3);
    }

    #[test]
    fn test_family_uses_timing_source_channel() {
        let inputs = SohInputs {
            series: vec![
                SohSeries {
                    channel: "LEO".into(),
                    day: day(23),
                    source: "leo".into(),
                    samples: vec![9000.0],
                },
                SohSeries {
                    channel: "LEP".into(),
                    day: day(23),
                    source: "lep".into(),
                    samples: vec![10.0],
                },
            ],
            logs: vec![log("day1", &[8], &["Fine locked"], &["Locked"])],
            timing_source: TimingSource::Ptp,
        };
        let out = AllInOne.evaluate(&inputs, &ThresholdSet::new());
        assert!(out.skipped.is_empty());
        assert!(out.verdicts.clock_offset.unwrap().passed());
        assert!(out.verdicts.satellites_locked.unwrap().passed());
        assert_eq!(out.plots.len(), 1);
    }

    #[test]
    fn test_family_skips_missing_sections() {
        let out = AllInOne.evaluate(&SohInputs::default(), &ThresholdSet::new());
        assert_eq!(out.skipped.len(), 2);
        assert!(out.verdicts.is_empty());
    }
}
