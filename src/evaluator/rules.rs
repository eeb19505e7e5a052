//! Threshold rules for ISPAQ station metrics.
//!
//! | Metric                 | Rule     |
//! |------------------------|----------|
//! | `percent_availability` | at least |
//! | `dead_channel_lin`     | at least |
//! | `num_gaps`, `max_gap`  | at most  |
//! | `num_overlaps`, `max_overlap` | at most |
//! | `num_spikes`, `sample_rms`    | at most |
//! | `pct_above_nhnm`, `pct_below_nlnm` | at most (percentage outside the noise model) |
//! | `dead_channel_gsn`, `sample_rate_channel`, `sample_rate_resp` | equals |
//!
//! Each metric's threshold is looked up under its own name. Metrics not in
//! the table are not evaluable and are left out of reports.

use crate::config::ThresholdSet;
use crate::evaluator::verdict::MetricVerdict;
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricRule {
    /// Every value must be greater than or equal to the threshold.
    AtLeast,
    /// Every value must be less than or equal to the threshold.
    AtMost,
    /// Every value must equal the threshold.
    Equals,
}

static RULES: &[(&str, MetricRule)] = &[
    ("percent_availability", MetricRule::AtLeast),
    ("dead_channel_lin", MetricRule::AtLeast),
    ("num_gaps", MetricRule::AtMost),
    ("max_gap", MetricRule::AtMost),
    ("num_overlaps", MetricRule::AtMost),
    ("max_overlap", MetricRule::AtMost),
    ("num_spikes", MetricRule::AtMost),
    ("sample_rms", MetricRule::AtMost),
    ("pct_above_nhnm", MetricRule::AtMost),
    ("pct_below_nlnm", MetricRule::AtMost),
    ("dead_channel_gsn", MetricRule::Equals),
    ("sample_rate_channel", MetricRule::Equals),
    ("sample_rate_resp", MetricRule::Equals),
];

/// The rule for `metric`, if it is evaluable.
pub fn rule_for(metric: &str) -> Option<MetricRule> {
    RULES.iter().find(|(m, _)| *m == metric).map(|(_, r)| *r)
}

pub fn is_evaluable(metric: &str) -> bool {
    rule_for(metric).is_some()
}

/// Evaluates `values` for `metric` against its configured threshold.
///
/// Each value carries the day its measurement window starts on; the first
/// breaching value and its day are named in the details. Returns `None` for
/// metrics that are not evaluable.
pub fn evaluate_metric(
    metric: &str,
    values: &[(NaiveDate, f64)],
    thresholds: &ThresholdSet,
) -> Option<MetricVerdict> {
    let rule = rule_for(metric)?;
    let threshold = thresholds.number(metric);

    if values.is_empty() {
        return Some(MetricVerdict::fail(
            Vec::<f64>::new(),
            format!("No {metric} values available"),
        ));
    }

    let breach = values.iter().find(|(_, v)| match rule {
        MetricRule::AtLeast => *v < threshold,
        MetricRule::AtMost => *v > threshold,
        MetricRule::Equals => *v != threshold,
    });

    let failure = breach.map(|(day, value)| {
        let relation = match rule {
            MetricRule::AtLeast => "below the minimum of",
            MetricRule::AtMost => "above the maximum of",
            MetricRule::Equals => "not equal to the expected",
        };
        format!(
            "{metric} value {value} on {} was {relation} {threshold}",
            day.format("%Y-%m-%d")
        )
    });

    Some(MetricVerdict::from_failure(
        values.iter().map(|(_, v)| *v),
        failure,
    ))
}
