//! SOH validation for instruments with a GNSS-disciplined clock and one
//! channel per SOH quantity.
//!
//! | Channel | Key                 | Per-day statistic        | Fails when        |
//! |---------|---------------------|--------------------------|-------------------|
//! | `LCE`   | `clock_offset`      | largest absolute offset  | above threshold   |
//! | `GST`   | `clock_locked`      | lock losses              | above threshold   |
//! | `LCQ`   | `timing_quality`    | mean timing quality (%)  | below threshold   |
//! | `GNS`   | `satellites_locked` | mean satellites in use   | below threshold   |
//!
//! Each channel is judged on its own; a channel with no data is skipped
//! without affecting the others.

use crate::config::ThresholdSet;
use crate::error::StationError;
use crate::evaluator::MetricVerdict;
use crate::evaluator::utility::{max_abs, mean, round2};
use crate::soh::{PlotRequest, SohFamily, SohInputs, SohOutcome, SohSeries, SohVerdicts};

pub const CLOCK_OFFSET_CHANNEL: &str = "LCE";
pub const CLOCK_LOCK_CHANNEL: &str = "GST";
pub const TIMING_QUALITY_CHANNEL: &str = "LCQ";
pub const SATELLITES_CHANNEL: &str = "GNS";

/// `GST` sample value while the receiver holds a lock.
pub const GST_LOCKED: f64 = 1.0;

pub struct GnssDisciplined;

#[derive(Clone, Copy)]
enum Bound {
    Max,
    Min,
}

/// Per-day statistic for every non-empty series on a channel, judged
/// against `threshold`. The first failing day is reported.
fn judge_daily(
    series: &[&SohSeries],
    statistic: impl Fn(&[f64]) -> f64,
    bound: Bound,
    threshold: f64,
    describe: impl Fn(f64, &SohSeries) -> String,
) -> MetricVerdict {
    let daily: Vec<(f64, &SohSeries)> = series
        .iter()
        .filter(|s| !s.samples.is_empty())
        .map(|s| (round2(statistic(&s.samples)), *s))
        .collect();

    let failure = daily
        .iter()
        .find(|(v, _)| match bound {
            Bound::Max => *v > threshold,
            Bound::Min => *v < threshold,
        })
        .map(|(v, s)| describe(*v, *s));

    MetricVerdict::from_failure(daily.iter().map(|(v, _)| *v), failure)
}

/// Number of locked-to-unlocked transitions in a day of `GST` samples.
pub fn lock_losses(samples: &[f64]) -> f64 {
    samples
        .windows(2)
        .filter(|w| w[0] == GST_LOCKED && w[1] != GST_LOCKED)
        .count() as f64
}

impl GnssDisciplined {
    fn channel_or_skip<'a>(
        inputs: &'a SohInputs,
        channel: &str,
        skipped: &mut Vec<StationError>,
    ) -> Option<Vec<&'a SohSeries>> {
        let series: Vec<&SohSeries> = inputs
            .channel(channel)
            .into_iter()
            .filter(|s| !s.samples.is_empty())
            .collect();
        if series.is_empty() {
            skipped.push(StationError::missing_soh(channel));
            None
        } else {
            Some(series)
        }
    }
}

impl SohFamily for GnssDisciplined {
    fn evaluate(&self, inputs: &SohInputs, thresholds: &ThresholdSet) -> SohOutcome {
        let mut skipped = Vec::new();
        let mut plots = Vec::new();

        let offset_threshold = thresholds.number("clock_offset");
        let offset = Self::channel_or_skip(inputs, CLOCK_OFFSET_CHANNEL, &mut skipped);
        let clock_offset = offset.as_ref().map(|series| {
            judge_daily(
                series,
                |s| max_abs(s).unwrap_or(0.0),
                Bound::Max,
                offset_threshold,
                |v, s| {
                    format!(
                        "Clock offset of {v} exceeded the threshold of {offset_threshold} on {}",
                        s.day
                    )
                },
            )
        });

        let lock_threshold = thresholds.number("clock_locked");
        let locked = Self::channel_or_skip(inputs, CLOCK_LOCK_CHANNEL, &mut skipped);
        let clock_locked = locked.as_ref().map(|series| {
            judge_daily(series, lock_losses, Bound::Max, lock_threshold, |v, s| {
                format!(
                    "Clock lost its lock {v} times on {}, more than the allowed {lock_threshold}",
                    s.day
                )
            })
        });

        if let (Some(locked), Some(offset)) = (&locked, &offset) {
            plots.push(PlotRequest::TimingError {
                clock_locked: locked.iter().map(|s| (*s).clone()).collect(),
                clock_offset: offset.iter().map(|s| (*s).clone()).collect(),
                threshold: offset_threshold,
            });
        }

        let quality_threshold = thresholds.number("timing_quality");
        let timing_quality = Self::channel_or_skip(inputs, TIMING_QUALITY_CHANNEL, &mut skipped)
            .map(|series| {
                judge_daily(&series, mean, Bound::Min, quality_threshold, |v, s| {
                    format!(
                        "Average timing quality of {v}% on {} was below the threshold of {quality_threshold}%",
                        s.day
                    )
                })
            });

        let satellite_threshold = thresholds.number("satellites_locked");
        let satellites_locked = Self::channel_or_skip(inputs, SATELLITES_CHANNEL, &mut skipped)
            .map(|series| {
                judge_daily(&series, mean, Bound::Min, satellite_threshold, |v, s| {
                    format!(
                        "Average number of satellites of {v} on {} was below the threshold of {satellite_threshold}",
                        s.day
                    )
                })
            });

        SohOutcome {
            verdicts: SohVerdicts {
                clock_offset,
                clock_locked,
                timing_quality,
                satellites_locked,
            },
            skipped,
            plots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Observation;
    use chrono::NaiveDate;

    fn series(channel: &str, day: u32, samples: &[f64]) -> SohSeries {
        SohSeries {
            channel: channel.into(),
            day: NaiveDate::from_ymd_opt(2022, 7, day).unwrap(),
            source: format!("QW.BCV13..{channel}.2022.{day}"),
            samples: samples.to_vec(),
        }
    }

    fn inputs(series: Vec<SohSeries>) -> SohInputs {
        SohInputs {
            series,
            ..Default::default()
        }
    }

    #[test]
    fn test_all_channels_pass() {
        let i = inputs(vec![
            series("LCE", 23, &[0.2, -0.5]),
            series("GST", 23, &[1.0, 1.0, 0.0, 1.0]),
            series("LCQ", 23, &[100.0, 90.0]),
            series("GNS", 23, &[8.0, 9.0]),
        ]);
        let out = GnssDisciplined.evaluate(&i, &ThresholdSet::new());
        assert!(out.skipped.is_empty());
        let v = out.verdicts;
        assert!(v.clock_offset.as_ref().unwrap().passed());
        assert_eq!(v.clock_offset.unwrap().values(), &[Observation::Number(0.5)]);
        assert_eq!(v.clock_locked.unwrap().values(), &[Observation::Number(1.0)]);
        assert!(v.timing_quality.unwrap().passed());
        assert!(v.satellites_locked.unwrap().passed());
        assert_eq!(out.plots.len(), 1);
    }

    #[test]
    fn test_missing_channel_is_skipped_independently() {
        let i = inputs(vec![series("LCQ", 23, &[50.0, 60.0])]);
        let out = GnssDisciplined.evaluate(&i, &ThresholdSet::new());

        assert_eq!(out.skipped.len(), 3);
        assert!(out.verdicts.clock_offset.is_none());
        assert!(out.plots.is_empty());
        let quality = out.verdicts.timing_quality.unwrap();
        assert!(!quality.passed());
        assert_eq!(
            quality.details(),
            "Average timing quality of 55% on 2022-07-23 was below the threshold of 70%"
        );
    }

    #[test]
    fn test_first_failing_day_is_reported() {
        let i = inputs(vec![
            series("LCE", 23, &[0.1]),
            series("LCE", 24, &[2.5]),
            series("LCE", 25, &[-3.0]),
        ]);
        let v = GnssDisciplined
            .evaluate(&i, &ThresholdSet::new())
            .verdicts
            .clock_offset
            .unwrap();
        assert!(!v.passed());
        assert!(v.details().ends_with("on 2022-07-24"));
        assert_eq!(v.values().len(), 3);
    }

    #[test]
    fn test_lock_losses() {
        assert_eq!(lock_losses(&[1.0, 0.0, 1.0, 0.0, 0.0, 1.0]), 2.0);
        assert_eq!(lock_losses(&[0.0, 0.0]), 0.0);
        assert_eq!(lock_losses(&[]), 0.0);
    }

    #[test]
    fn test_too_many_lock_losses_fail() {
        let flapping: Vec<f64> = (0..20).map(|i| (i % 2) as f64).collect();
        let i = inputs(vec![series("GST", 23, &flapping)]);
        let v = GnssDisciplined
            .evaluate(&i, &ThresholdSet::new())
            .verdicts
            .clock_locked
            .unwrap();
        assert!(!v.passed());
        assert!(v.details().starts_with("Clock lost its lock 9 times"));
    }
}
