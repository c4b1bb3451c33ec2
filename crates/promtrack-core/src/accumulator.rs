//! Per-series accumulators.
//!
//! Counters and gauges are lock-free: the f64 is stored as its bit pattern in
//! an `AtomicU64` and updated with a CAS loop, so concurrent increments never
//! lose updates. Histograms keep buckets, sum and count behind one `Mutex` so
//! a reader never sees `+Inf` disagree with `count`.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::descriptor::{MetricDescriptor, MetricKind};
use crate::error::{MetricsError, Result};

#[derive(Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, delta: f64) {
        // The closure never returns None, so this cannot fail.
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + delta).to_bits())
            });
    }
}

/// Every `i64` is a valid timestamp, so presence is a separate flag.
#[derive(Debug)]
struct SampleTimestamp {
    present: AtomicBool,
    ms: AtomicI64,
}

impl SampleTimestamp {
    fn new() -> Self {
        Self {
            present: AtomicBool::new(false),
            ms: AtomicI64::new(0),
        }
    }

    fn store(&self, ts: Option<i64>) {
        match ts {
            Some(ts) => {
                self.ms.store(ts, Ordering::Relaxed);
                self.present.store(true, Ordering::Release);
            }
            None => self.present.store(false, Ordering::Release),
        }
    }

    fn load(&self) -> Option<i64> {
        if self.present.load(Ordering::Acquire) {
            Some(self.ms.load(Ordering::Relaxed))
        } else {
            None
        }
    }
}

/// Monotonic sum.
#[derive(Debug)]
pub struct CounterState {
    value: AtomicF64,
    timestamp: SampleTimestamp,
}

impl CounterState {
    pub fn new() -> Self {
        Self {
            value: AtomicF64::new(0.0),
            timestamp: SampleTimestamp::new(),
        }
    }

    /// Add `delta`. The timestamp (ms since epoch) only decorates the emitted
    /// sample; an update without one clears the previous timestamp.
    pub fn inc_by(&self, delta: f64, timestamp_ms: Option<i64>) -> Result<()> {
        if delta.is_nan() || delta < 0.0 {
            return Err(MetricsError::InvalidDelta(delta));
        }
        self.value.add(delta);
        self.timestamp.store(timestamp_ms);
        Ok(())
    }

    pub fn get(&self) -> f64 {
        self.value.load()
    }
}

impl Default for CounterState {
    fn default() -> Self {
        Self::new()
    }
}

/// Last-write-wins value, any sign.
#[derive(Debug)]
pub struct GaugeState {
    value: AtomicF64,
    timestamp: SampleTimestamp,
}

impl GaugeState {
    pub fn new() -> Self {
        Self {
            value: AtomicF64::new(0.0),
            timestamp: SampleTimestamp::new(),
        }
    }

    pub fn add(&self, delta: f64, timestamp_ms: Option<i64>) {
        self.value.add(delta);
        self.timestamp.store(timestamp_ms);
    }

    pub fn set(&self, value: f64, timestamp_ms: Option<i64>) {
        self.value.store(value);
        self.timestamp.store(timestamp_ms);
    }

    pub fn get(&self) -> f64 {
        self.value.load()
    }
}

impl Default for GaugeState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct HistogramInner {
    /// One slot per upper bound plus the trailing `+Inf` slot.
    bucket_counts: Vec<u64>,
    sum: f64,
    count: u64,
}

/// Cumulative bucket counts plus sum and count.
#[derive(Debug)]
pub struct HistogramState {
    upper_bounds: Arc<[f64]>,
    inner: Mutex<HistogramInner>,
}

impl HistogramState {
    /// `upper_bounds` must already be validated (finite, strictly ascending).
    pub fn new(upper_bounds: Arc<[f64]>) -> Self {
        let slots = upper_bounds.len() + 1;
        Self {
            upper_bounds,
            inner: Mutex::new(HistogramInner {
                bucket_counts: vec![0; slots],
                sum: 0.0,
                count: 0,
            }),
        }
    }

    // Every critical section leaves the counters consistent, so a poisoned
    // lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, HistogramInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one observation into every bucket whose bound is `>= value`.
    pub fn observe(&self, value: f64) -> Result<()> {
        if value.is_nan() {
            return Err(MetricsError::InvalidObservation);
        }

        let mut h = self.lock();
        h.sum += value;
        h.count += 1;
        for (i, &le) in self.upper_bounds.iter().enumerate() {
            if value <= le {
                h.bucket_counts[i] += 1;
            }
        }
        if let Some(inf) = h.bucket_counts.last_mut() {
            *inf += 1;
        }
        Ok(())
    }

    pub fn reset(&self) {
        let mut h = self.lock();
        h.bucket_counts.iter_mut().for_each(|c| *c = 0);
        h.sum = 0.0;
        h.count = 0;
    }

    pub fn upper_bounds(&self) -> &[f64] {
        &self.upper_bounds
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        let h = self.lock();
        HistogramSnapshot {
            bucket_counts: h.bucket_counts.clone(),
            sum: h.sum,
            count: h.count,
        }
    }
}

/// Point-in-time copy of a histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    /// Cumulative counts aligned with the family buckets, `+Inf` last.
    pub bucket_counts: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

/// Closed set of accumulators, one per [`MetricKind`].
#[derive(Debug)]
pub enum Accumulator {
    Counter(Arc<CounterState>),
    Gauge(Arc<GaugeState>),
    Histogram(Arc<HistogramState>),
}

impl Accumulator {
    /// Zero-valued accumulator matching the descriptor's kind.
    pub fn for_descriptor(desc: &MetricDescriptor, upper_bounds: &Arc<[f64]>) -> Self {
        match desc.kind {
            MetricKind::Counter => Accumulator::Counter(Arc::new(CounterState::new())),
            MetricKind::Gauge => Accumulator::Gauge(Arc::new(GaugeState::new())),
            MetricKind::Histogram => Accumulator::Histogram(Arc::new(HistogramState::new(
                Arc::clone(upper_bounds),
            ))),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Accumulator::Counter(_) => MetricKind::Counter,
            Accumulator::Gauge(_) => MetricKind::Gauge,
            Accumulator::Histogram(_) => MetricKind::Histogram,
        }
    }

    pub fn snapshot(&self) -> Sample {
        match self {
            Accumulator::Counter(c) => Sample::Counter {
                value: c.get(),
                timestamp_ms: c.timestamp.load(),
            },
            Accumulator::Gauge(g) => Sample::Gauge {
                value: g.get(),
                timestamp_ms: g.timestamp.load(),
            },
            Accumulator::Histogram(h) => Sample::Histogram(h.snapshot()),
        }
    }
}

/// Accumulator snapshot handed to the exposition formatter.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Counter {
        value: f64,
        timestamp_ms: Option<i64>,
    },
    Gauge {
        value: f64,
        timestamp_ms: Option<i64>,
    },
    Histogram(HistogramSnapshot),
}
