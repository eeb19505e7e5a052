//! Threshold configuration.
//!
//! Stored as a JSON object on disk, either flat or nested under a
//! `thresholds` key:
//! ```json
//! {
//!   "thresholds": {
//!     "clock_offset": 1,
//!     "data_timeliness": 3,
//!     "clock_quality_state": "Fine locked"
//!   }
//! }
//! ```
//! Every known key carries a hard-coded fallback so an incomplete file still
//! yields a usable [`ThresholdSet`].

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// A configured threshold value: numeric bound or categorical expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdValue {
    Number(f64),
    Text(String),
}

impl ThresholdValue {
    /// Numeric view. Text values that parse as numbers are accepted.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ThresholdValue::Number(n) => Some(*n),
            ThresholdValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Textual view, used by categorical rules.
    pub fn as_text(&self) -> String {
        match self {
            ThresholdValue::Number(n) => n.to_string(),
            ThresholdValue::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for ThresholdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdValue::Number(n) => write!(f, "{n}"),
            ThresholdValue::Text(s) => f.write_str(s),
        }
    }
}

/// A resolved threshold lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdEntry {
    pub metric_key: String,
    pub value: ThresholdValue,
    /// `true` when the value came from the built-in defaults.
    pub applies_fallback: bool,
}

/// Built-in defaults for every key the validators consult.
static FALLBACKS: &[(&str, Fallback)] = &[
    ("clock_offset", Fallback::Number(1.0)),
    ("clock_locked", Fallback::Number(6.0)),
    ("data_timeliness", Fallback::Number(3.0)),
    ("timely_data_percentage", Fallback::Number(98.0)),
    ("timing_quality", Fallback::Number(70.0)),
    ("satellites_locked", Fallback::Number(6.0)),
    ("fine_clock_offset_us", Fallback::Number(100.0)),
    ("clock_quality_state", Fallback::Text("Fine locked")),
    ("clock_lock_state", Fallback::Text("Locked")),
    ("percent_availability", Fallback::Number(98.0)),
    ("num_gaps", Fallback::Number(0.0)),
    ("max_gap", Fallback::Number(1.0)),
    ("num_overlaps", Fallback::Number(0.0)),
    ("max_overlap", Fallback::Number(1.0)),
    ("num_spikes", Fallback::Number(0.0)),
    ("sample_rms", Fallback::Number(50000.0)),
    ("dead_channel_lin", Fallback::Number(2.0)),
    ("pct_above_nhnm", Fallback::Number(90.0)),
    ("pct_below_nlnm", Fallback::Number(20.0)),
    ("dead_channel_gsn", Fallback::Number(0.0)),
    ("sample_rate_channel", Fallback::Number(0.0)),
    ("sample_rate_resp", Fallback::Number(0.0)),
];

#[derive(Debug, Clone, Copy)]
enum Fallback {
    Number(f64),
    Text(&'static str),
}

impl From<Fallback> for ThresholdValue {
    fn from(f: Fallback) -> Self {
        match f {
            Fallback::Number(n) => ThresholdValue::Number(n),
            Fallback::Text(s) => ThresholdValue::Text(s.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ThresholdFile {
    Sectioned {
        thresholds: HashMap<String, ThresholdValue>,
    },
    Flat(HashMap<String, ThresholdValue>),
}

/// Mapping of metric key to configured threshold.
#[derive(Debug, Clone, Default)]
pub struct ThresholdSet {
    entries: HashMap<String, ThresholdValue>,
}

impl ThresholdSet {
    /// An empty set: every lookup resolves to its fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the set from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let entries = match serde_json::from_str::<ThresholdFile>(content)? {
            ThresholdFile::Sectioned { thresholds } => thresholds,
            ThresholdFile::Flat(map) => map,
        };
        Ok(Self { entries })
    }

    /// Overrides a single key.
    pub fn with(mut self, key: &str, value: ThresholdValue) -> Self {
        self.entries.insert(key.to_string(), value);
        self
    }

    /// Resolves `key`, falling back to the built-in default.
    ///
    /// Keys with neither a configured value nor a default resolve to
    /// `Number(0.0)` flagged as a fallback.
    pub fn get(&self, key: &str) -> ThresholdEntry {
        match self.entries.get(key) {
            Some(value) => ThresholdEntry {
                metric_key: key.to_string(),
                value: value.clone(),
                applies_fallback: false,
            },
            None => ThresholdEntry {
                metric_key: key.to_string(),
                value: fallback(key)
                    .map(ThresholdValue::from)
                    .unwrap_or(ThresholdValue::Number(0.0)),
                applies_fallback: true,
            },
        }
    }

    /// Numeric lookup. A configured value that is not numeric is ignored in
    /// favour of the default.
    pub fn number(&self, key: &str) -> f64 {
        self.get(key)
            .value
            .as_f64()
            .or_else(|| fallback(key).and_then(|f| ThresholdValue::from(f).as_f64()))
            .unwrap_or(0.0)
    }

    pub fn text(&self, key: &str) -> String {
        self.get(key).value.as_text()
    }
}

fn fallback(key: &str) -> Option<Fallback> {
    FALLBACKS.iter().find(|(k, _)| *k == key).map(|(_, f)| *f)
}
