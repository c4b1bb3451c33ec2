//! Typed family wrappers and series handles.
//!
//! `CounterVec` / `GaugeVec` / `HistogramVec` wrap a shared family and hand
//! out handles that point straight at the series accumulator. Two handles for
//! the same label values share one accumulator.

use std::sync::Arc;
use std::time::Instant;

use crate::accumulator::{Accumulator, CounterState, GaugeState, HistogramSnapshot, HistogramState};
use crate::descriptor::MetricKind;
use crate::error::{MetricsError, Result};
use crate::family::MetricFamily;

fn expect_kind(family: &MetricFamily, expected: MetricKind) -> Result<()> {
    if family.kind() != expected {
        return Err(MetricsError::UnknownKind {
            name: family.name().to_string(),
            expected,
        });
    }
    Ok(())
}

fn kind_mismatch(family: &MetricFamily, expected: MetricKind) -> MetricsError {
    MetricsError::UnknownKind {
        name: family.name().to_string(),
        expected,
    }
}

// --------------------
// Counter
// --------------------
#[derive(Debug, Clone)]
pub struct CounterVec {
    family: Arc<MetricFamily>,
}

impl CounterVec {
    pub fn new(family: Arc<MetricFamily>) -> Result<Self> {
        expect_kind(&family, MetricKind::Counter)?;
        Ok(Self { family })
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<Counter> {
        match self.family.labels(values)?.state() {
            Accumulator::Counter(c) => Ok(Counter(Arc::clone(c))),
            _ => Err(kind_mismatch(&self.family, MetricKind::Counter)),
        }
    }

    pub fn family(&self) -> &Arc<MetricFamily> {
        &self.family
    }
}

#[derive(Debug, Clone)]
pub struct Counter(Arc<CounterState>);

impl Counter {
    pub fn inc(&self) {
        // 1 is always a valid delta.
        let _ = self.0.inc_by(1.0, None);
    }

    pub fn inc_by(&self, delta: f64) -> Result<()> {
        self.0.inc_by(delta, None)
    }

    /// Increment and attach `timestamp_ms` (ms since epoch) to the sample.
    pub fn inc_by_at(&self, delta: f64, timestamp_ms: i64) -> Result<()> {
        self.0.inc_by(delta, Some(timestamp_ms))
    }

    pub fn get(&self) -> f64 {
        self.0.get()
    }

    /// True when both handles refer to the same series.
    pub fn same_series(&self, other: &Counter) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// --------------------
// Gauge
// --------------------
#[derive(Debug, Clone)]
pub struct GaugeVec {
    family: Arc<MetricFamily>,
}

impl GaugeVec {
    pub fn new(family: Arc<MetricFamily>) -> Result<Self> {
        expect_kind(&family, MetricKind::Gauge)?;
        Ok(Self { family })
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<Gauge> {
        match self.family.labels(values)?.state() {
            Accumulator::Gauge(g) => Ok(Gauge(Arc::clone(g))),
            _ => Err(kind_mismatch(&self.family, MetricKind::Gauge)),
        }
    }

    pub fn family(&self) -> &Arc<MetricFamily> {
        &self.family
    }
}

#[derive(Debug, Clone)]
pub struct Gauge(Arc<GaugeState>);

impl Gauge {
    pub fn inc(&self) {
        self.0.add(1.0, None);
    }

    pub fn dec(&self) {
        self.0.add(-1.0, None);
    }

    pub fn add(&self, delta: f64) {
        self.0.add(delta, None);
    }

    pub fn sub(&self, delta: f64) {
        self.0.add(-delta, None);
    }

    pub fn set(&self, value: f64) {
        self.0.set(value, None);
    }

    pub fn add_at(&self, delta: f64, timestamp_ms: i64) {
        self.0.add(delta, Some(timestamp_ms));
    }

    pub fn set_at(&self, value: f64, timestamp_ms: i64) {
        self.0.set(value, Some(timestamp_ms));
    }

    pub fn get(&self) -> f64 {
        self.0.get()
    }

    pub fn same_series(&self, other: &Gauge) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// --------------------
// Histogram
// --------------------
#[derive(Debug, Clone)]
pub struct HistogramVec {
    family: Arc<MetricFamily>,
}

impl HistogramVec {
    pub fn new(family: Arc<MetricFamily>) -> Result<Self> {
        expect_kind(&family, MetricKind::Histogram)?;
        Ok(Self { family })
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<Histogram> {
        match self.family.labels(values)?.state() {
            Accumulator::Histogram(h) => Ok(Histogram(Arc::clone(h))),
            _ => Err(kind_mismatch(&self.family, MetricKind::Histogram)),
        }
    }

    /// Zero every series of the family; the series themselves stay registered.
    pub fn reset_all(&self) {
        for series in self.family.series() {
            if let Accumulator::Histogram(h) = series.state() {
                h.reset();
            }
        }
    }

    pub fn family(&self) -> &Arc<MetricFamily> {
        &self.family
    }
}

#[derive(Debug, Clone)]
pub struct Histogram(Arc<HistogramState>);

impl Histogram {
    pub fn observe(&self, value: f64) -> Result<()> {
        self.0.observe(value)
    }

    pub fn reset(&self) {
        self.0.reset();
    }

    /// Start timing; the elapsed seconds are observed once, on
    /// [`HistogramTimer::observe_duration`] or on drop.
    pub fn start_timer(&self) -> HistogramTimer {
        HistogramTimer {
            hist: Arc::clone(&self.0),
            start: Instant::now(),
            observed: false,
        }
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        self.0.snapshot()
    }

    pub fn upper_bounds(&self) -> &[f64] {
        self.0.upper_bounds()
    }

    pub fn same_series(&self, other: &Histogram) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Observes elapsed wall time into a histogram series exactly once.
#[must_use = "dropping the timer immediately records a near-zero duration"]
#[derive(Debug)]
pub struct HistogramTimer {
    hist: Arc<HistogramState>,
    start: Instant,
    observed: bool,
}

impl HistogramTimer {
    /// Observe now and return the recorded seconds.
    pub fn observe_duration(mut self) -> f64 {
        self.record()
    }

    fn record(&mut self) -> f64 {
        let secs = self.start.elapsed().as_secs_f64();
        if !self.observed {
            self.observed = true;
            // Elapsed seconds are never NaN.
            let _ = self.hist.observe(secs);
        }
        secs
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        if !self.observed {
            self.record();
        }
    }
}
