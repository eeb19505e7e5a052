//! Error types for station validation.
//!
//! Variants are split into fatal conditions, which abort report generation,
//! and recoverable ones, which only cost the report a section.

use thiserror::Error;

/// Result type alias using [`StationError`].
pub type Result<T> = std::result::Result<T, StationError>;

#[derive(Error, Debug)]
pub enum StationError {
    /// A query was issued before any metric source was ingested.
    #[error("Metric data not loaded. Check the ISPAQ csv folder")]
    DataNotLoaded,

    /// Ingestion finished without a single evaluable metric.
    #[error("No results from ISPAQ found. Please check ISPAQ_TRANSCRIPT.log")]
    NoMetricsFound,

    #[error("Malformed target '{target}': expected NET.STA.LOC.CHA.Q")]
    MalformedTarget { target: String },

    #[error("Metric source {source_name} is missing columns: {columns:?}")]
    MissingColumns {
        source_name: String,
        columns: Vec<String>,
    },

    #[error("Unparsable timestamp '{value}' in {source_name}")]
    InvalidTimestamp { source_name: String, value: String },

    #[error("Invalid validation period: {0}")]
    InvalidPeriod(String),

    #[error("Unknown instrument type: {0}")]
    UnknownInstrument(String),

    #[error("Unknown timing source: {0} (expected GNSS or PTP)")]
    UnknownTimingSource(String),

    #[error("No latency data available for the validation period")]
    NoLatencyData,

    #[error("{channel} data does not exist")]
    MissingSohData { channel: String },

    #[error("Failed to parse SOH file {file}: {message}")]
    SohParse { file: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StationError {
    /// Returns `true` when the condition must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StationError::NoMetricsFound
                | StationError::DataNotLoaded
                | StationError::MalformedTarget { .. }
                | StationError::MissingColumns { .. }
                | StationError::InvalidTimestamp { .. }
                | StationError::InvalidPeriod(_)
        )
    }

    pub fn missing_soh(channel: impl Into<String>) -> Self {
        StationError::MissingSohData {
            channel: channel.into(),
        }
    }

    pub fn soh_parse(file: impl Into<String>, message: impl Into<String>) -> Self {
        StationError::SohParse {
            file: file.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(StationError::NoMetricsFound.is_fatal());
        assert!(
            StationError::MalformedTarget {
                target: "QW.BCV13".into()
            }
            .is_fatal()
        );
        assert!(!StationError::NoLatencyData.is_fatal());
        assert!(!StationError::missing_soh("LCE").is_fatal());
    }

    #[test]
    fn test_missing_soh_message_names_channel() {
        let e = StationError::missing_soh("GST");
        assert_eq!(e.to_string(), "GST data does not exist");
    }
}
