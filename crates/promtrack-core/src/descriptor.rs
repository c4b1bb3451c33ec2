//! Metric family descriptors.
//!
//! A descriptor is fixed at registration: name, help text, ordered label names,
//! kind, and (histograms only) bucket boundaries. Validation happens once in
//! [`MetricDescriptor::validate`] so the hot path never re-checks names.

use std::fmt;

use crate::error::{MetricsError, Result};

/// Default histogram boundaries (seconds), tuned for request latencies.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Closed set of metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Name used in `# TYPE` lines.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub kind: MetricKind,
    /// Upper bounds without the implicit `+Inf`. Empty unless `kind` is histogram.
    pub buckets: Vec<f64>,
}

impl MetricDescriptor {
    pub fn counter(name: &str, help: &str, label_names: &[&str]) -> Self {
        Self::new(name, help, label_names, MetricKind::Counter, Vec::new())
    }

    pub fn gauge(name: &str, help: &str, label_names: &[&str]) -> Self {
        Self::new(name, help, label_names, MetricKind::Gauge, Vec::new())
    }

    pub fn histogram(name: &str, help: &str, label_names: &[&str], buckets: &[f64]) -> Self {
        Self::new(name, help, label_names, MetricKind::Histogram, buckets.to_vec())
    }

    fn new(
        name: &str,
        help: &str,
        label_names: &[&str],
        kind: MetricKind,
        buckets: Vec<f64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
            kind,
            buckets,
        }
    }

    /// Check names and buckets. A trailing `+Inf` boundary is stripped since
    /// the exposition always adds it.
    pub fn validate(&mut self) -> Result<()> {
        if !is_metric_name(&self.name) {
            return Err(MetricsError::InvalidName(format!(
                "metric name {:?}",
                self.name
            )));
        }

        for (i, label) in self.label_names.iter().enumerate() {
            if !is_label_name(label) || label.starts_with("__") {
                return Err(MetricsError::InvalidName(format!(
                    "{}: label name {:?}",
                    self.name, label
                )));
            }
            if self.label_names[..i].contains(label) {
                return Err(MetricsError::InvalidName(format!(
                    "{}: duplicate label name {:?}",
                    self.name, label
                )));
            }
            if self.kind == MetricKind::Histogram && label == "le" {
                return Err(MetricsError::InvalidName(format!(
                    "{}: label name \"le\" is reserved for histograms",
                    self.name
                )));
            }
        }

        match self.kind {
            MetricKind::Histogram => {
                if self.buckets.last() == Some(&f64::INFINITY) {
                    self.buckets.pop();
                }
                validate_buckets(&self.name, &self.buckets)
            }
            MetricKind::Counter | MetricKind::Gauge => {
                if !self.buckets.is_empty() {
                    return Err(MetricsError::InvalidBuckets(format!(
                        "{}: buckets are only valid for histograms",
                        self.name
                    )));
                }
                Ok(())
            }
        }
    }
}

fn validate_buckets(name: &str, buckets: &[f64]) -> Result<()> {
    if buckets.is_empty() {
        return Err(MetricsError::InvalidBuckets(format!(
            "{name}: at least one bucket is required"
        )));
    }
    if let Some(b) = buckets.iter().find(|b| !b.is_finite()) {
        return Err(MetricsError::InvalidBuckets(format!(
            "{name}: bucket {b} is not finite"
        )));
    }
    for w in buckets.windows(2) {
        if w[0] >= w[1] {
            return Err(MetricsError::InvalidBuckets(format!(
                "{name}: buckets must be strictly ascending ({} >= {})",
                w[0], w[1]
            )));
        }
    }
    Ok(())
}

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
fn is_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
fn is_label_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
