//! Per-channel statistical metrics produced by ISPAQ.
//!
//! [`MetricTable`] accumulates rows from the basic, PSD-derived and
//! sample-rate CSV outputs; [`MetricSources`] finds those files for a run.

pub mod sources;
pub mod table;

pub use sources::{MetricSources, load_metric_table};
pub use table::{MetricQuery, MetricRow, MetricTable, Target};
