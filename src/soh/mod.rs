//! State-of-health evaluation.
//!
//! The instrument family decides where the SOH readings come from and how
//! they are judged. [`InstrumentType::family`] picks the [`SohFamily`]
//! implementation; every family reports under the same four keys.

pub mod all_in_one;
pub mod gnss;
pub mod records;

use crate::config::ThresholdSet;
use crate::error::StationError;
use crate::evaluator::MetricVerdict;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use all_in_one::AllInOne;
pub use gnss::GnssDisciplined;
pub use records::{DailySohLog, SohSeries};

/// Instrument models with a known SOH layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentType {
    /// Nanometrics Titan SMA: separate LCE/GST/LCQ/GNS channels.
    TitanSma,
    /// Güralp Fortimus: one composite SOH log per day.
    Fortimus,
}

impl InstrumentType {
    pub fn family(&self) -> Box<dyn SohFamily> {
        match self {
            InstrumentType::TitanSma => Box::new(GnssDisciplined),
            InstrumentType::Fortimus => Box::new(AllInOne),
        }
    }
}

impl FromStr for InstrumentType {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "titansma" | "titan_sma" | "titan sma" => Ok(InstrumentType::TitanSma),
            "fortimus" => Ok(InstrumentType::Fortimus),
            _ => Err(StationError::UnknownInstrument(s.to_string())),
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentType::TitanSma => f.write_str("titansma"),
            InstrumentType::Fortimus => f.write_str("fortimus"),
        }
    }
}

/// Reference the all-in-one family disciplines its clock against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingSource {
    #[default]
    Gnss,
    Ptp,
}

impl TimingSource {
    /// Channel carrying the raw clock offset counts.
    pub fn clock_offset_channel(&self) -> &'static str {
        match self {
            TimingSource::Gnss => "LEO",
            TimingSource::Ptp => "LEP",
        }
    }
}

impl FromStr for TimingSource {
    type Err = StationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gnss" => Ok(TimingSource::Gnss),
            "ptp" => Ok(TimingSource::Ptp),
            _ => Err(StationError::UnknownTimingSource(s.to_string())),
        }
    }
}

/// Raw SOH readings for one validation period.
#[derive(Debug, Clone, Default)]
pub struct SohInputs {
    /// Per-day channel samples (LCE, GST, LCQ, GNS, LEO, LEP, ...).
    pub series: Vec<SohSeries>,
    /// Daily composite logs of all-in-one instruments.
    pub logs: Vec<DailySohLog>,
    pub timing_source: TimingSource,
}

impl SohInputs {
    /// Series recorded on `channel`, in input order.
    pub fn channel(&self, channel: &str) -> Vec<&SohSeries> {
        self.series.iter().filter(|s| s.channel == channel).collect()
    }
}

/// SOH verdicts under their report keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SohVerdicts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_offset: Option<MetricVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_locked: Option<MetricVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_quality: Option<MetricVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellites_locked: Option<MetricVerdict>,
}

impl SohVerdicts {
    pub fn is_empty(&self) -> bool {
        self.clock_offset.is_none()
            && self.clock_locked.is_none()
            && self.timing_quality.is_none()
            && self.satellites_locked.is_none()
    }
}

/// Data handed to the plotting collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotRequest {
    /// Clock lock state against clock offset, per day.
    TimingError {
        clock_locked: Vec<SohSeries>,
        clock_offset: Vec<SohSeries>,
        threshold: f64,
    },
    /// Calibrated clock offset in microseconds, per day.
    ClockOffset {
        series: Vec<SohSeries>,
        threshold_us: f64,
    },
}

/// Everything a family evaluation produced.
#[derive(Debug, Default)]
pub struct SohOutcome {
    pub verdicts: SohVerdicts,
    /// Sections left out, with the reason.
    pub skipped: Vec<StationError>,
    pub plots: Vec<PlotRequest>,
}

/// An instrument family's SOH validation.
pub trait SohFamily {
    /// Judges `inputs` against `thresholds`. Must not log or do I/O.
    fn evaluate(&self, inputs: &SohInputs, thresholds: &ThresholdSet) -> SohOutcome;
}

/// Renders plot requests. Plotting lives outside this crate.
pub trait Plotter {
    fn plot(&self, request: &PlotRequest) -> anyhow::Result<()>;
}

/// Drops every request.
pub struct NoopPlotter;

impl Plotter for NoopPlotter {
    fn plot(&self, _request: &PlotRequest) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrument_type_parsing() {
        assert_eq!("TitanSMA".parse::<InstrumentType>().unwrap(), InstrumentType::TitanSma);
        assert_eq!(" fortimus ".parse::<InstrumentType>().unwrap(), InstrumentType::Fortimus);
        assert!(matches!(
            "apollo".parse::<InstrumentType>(),
            Err(StationError::UnknownInstrument(_))
        ));
    }

    #[test]
    fn test_timing_source_channel() {
        assert_eq!("GNSS".parse::<TimingSource>().unwrap().clock_offset_channel(), "LEO");
        assert_eq!("ptp".parse::<TimingSource>().unwrap().clock_offset_channel(), "LEP");
        assert!("ntp".parse::<TimingSource>().is_err());
    }
}
