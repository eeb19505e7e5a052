use serde::Serialize;

/// One observed value carried in a verdict: a measurement or a categorical
/// state such as a clock status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Observation {
    Number(f64),
    Text(String),
}

impl From<f64> for Observation {
    fn from(v: f64) -> Self {
        Observation::Number(v)
    }
}

impl From<u32> for Observation {
    fn from(v: u32) -> Self {
        Observation::Number(v as f64)
    }
}

impl From<&str> for Observation {
    fn from(v: &str) -> Self {
        Observation::Text(v.to_string())
    }
}

impl From<String> for Observation {
    fn from(v: String) -> Self {
        Observation::Text(v)
    }
}

/// Pass/fail result for one metric over one validation period.
///
/// Built once; re-evaluating produces a new verdict rather than editing an
/// old one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricVerdict {
    passed: bool,
    details: String,
    values: Vec<Observation>,
}

impl MetricVerdict {
    pub fn pass<T: Into<Observation>>(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            passed: true,
            details: String::new(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fail<T: Into<Observation>>(
        values: impl IntoIterator<Item = T>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            passed: false,
            details: details.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Passes when `failure` is `None`, otherwise fails with its text.
    pub fn from_failure<T: Into<Observation>>(
        values: impl IntoIterator<Item = T>,
        failure: Option<String>,
    ) -> Self {
        match failure {
            None => Self::pass(values),
            Some(details) => Self::fail(values, details),
        }
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Empty when the verdict passed.
    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn values(&self) -> &[Observation] {
        &self.values
    }
}
