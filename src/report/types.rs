//! Data types of the validation report.

use crate::evaluator::MetricVerdict;
use crate::soh::SohVerdicts;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Verdicts for every evaluable metric recorded on one channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelReport {
    pub(crate) metrics: BTreeMap<String, MetricVerdict>,
}

impl ChannelReport {
    pub fn metrics(&self) -> &BTreeMap<String, MetricVerdict> {
        &self.metrics
    }

    pub fn metric(&self, name: &str) -> Option<&MetricVerdict> {
        self.metrics.get(name)
    }
}

/// Complete validation result for one station over one period, written as
/// JSON.
///
/// Channel verdicts are nested under `channels`; the latency and SOH
/// verdicts sit at the top level and are left out when their section was
/// skipped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub(crate) network_code: String,
    pub(crate) station_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) location_code: Option<String>,
    pub(crate) start_date: NaiveDate,
    /// Last day covered, not the exclusive end of the period.
    pub(crate) end_date: NaiveDate,
    pub(crate) channels: BTreeMap<String, ChannelReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) timely_availability: Option<MetricVerdict>,
    #[serde(flatten)]
    pub(crate) soh: SohVerdicts,
    #[serde(skip)]
    pub(crate) file_name: String,
}

impl Report {
    pub fn network_code(&self) -> &str {
        &self.network_code
    }

    pub fn station_code(&self) -> &str {
        &self.station_code
    }

    pub fn location_code(&self) -> Option<&str> {
        self.location_code.as_deref()
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn channels(&self) -> &BTreeMap<String, ChannelReport> {
        &self.channels
    }

    pub fn channel(&self, code: &str) -> Option<&ChannelReport> {
        self.channels.get(code)
    }

    pub fn timely_availability(&self) -> Option<&MetricVerdict> {
        self.timely_availability.as_ref()
    }

    pub fn soh(&self) -> &SohVerdicts {
        &self.soh
    }

    /// Name the report is written under.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `true` when every verdict in the report passed.
    pub fn all_passed(&self) -> bool {
        let soh = [
            &self.soh.clock_offset,
            &self.soh.clock_locked,
            &self.soh.timing_quality,
            &self.soh.satellites_locked,
        ];
        self.channels
            .values()
            .flat_map(|c| c.metrics.values())
            .chain(self.timely_availability.iter())
            .chain(soh.into_iter().flatten())
            .all(MetricVerdict::passed)
    }
}
