//! Pure threshold evaluation.
//!
//! Nothing in here logs or touches the filesystem: the same values and
//! thresholds always produce the same [`MetricVerdict`].

pub mod rules;
pub mod utility;
pub mod verdict;

pub use rules::{MetricRule, evaluate_metric, is_evaluable, rule_for};
pub use verdict::{MetricVerdict, Observation};
