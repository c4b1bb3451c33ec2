//! Metric families and their label-indexed series store.
//!
//! A family owns one series per distinct ordered label-value tuple. Lookups
//! go through a `DashMap` keyed by the owned tuple but hashed through a
//! borrowed view, so a hit never allocates. Creation uses the entry API so
//! the shard lock is held while the accumulator is built, giving at most one
//! series per tuple under concurrent first access. Series are never evicted.

use std::borrow::Borrow;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::accumulator::{Accumulator, Sample};
use crate::descriptor::{MetricDescriptor, MetricKind};
use crate::error::{MetricsError, Result};

/// Ordered label values. Equality is positional.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[&str]> for LabelSet {
    fn from(values: &[&str]) -> Self {
        LabelSet(values.iter().map(|v| v.to_string()).collect())
    }
}

/// One label instantiation of a family.
#[derive(Debug)]
pub struct Series {
    labels: LabelSet,
    created_seq: u64,
    state: Accumulator,
}

impl Series {
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn state(&self) -> &Accumulator {
        &self.state
    }
}

/// Ordered label values, owned or borrowed. Owned keys and `&[&str]`
/// lookups hash and compare through this view so they agree.
trait LabelValues {
    fn arity(&self) -> usize;
    fn value(&self, i: usize) -> &str;
}

impl LabelValues for Vec<String> {
    fn arity(&self) -> usize {
        self.len()
    }

    fn value(&self, i: usize) -> &str {
        &self[i]
    }
}

impl LabelValues for &[&str] {
    fn arity(&self) -> usize {
        self.len()
    }

    fn value(&self, i: usize) -> &str {
        self[i]
    }
}

impl Hash for dyn LabelValues + '_ {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.arity());
        for i in 0..self.arity() {
            self.value(i).hash(state);
        }
    }
}

impl PartialEq for dyn LabelValues + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.arity() == other.arity() && (0..self.arity()).all(|i| self.value(i) == other.value(i))
    }
}

impl Eq for dyn LabelValues + '_ {}

/// Owned map key.
#[derive(Debug)]
struct SeriesKey(Vec<String>);

impl SeriesKey {
    fn view(&self) -> &dyn LabelValues {
        &self.0
    }
}

impl Hash for SeriesKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.view().hash(state)
    }
}

impl PartialEq for SeriesKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SeriesKey {}

impl<'a> Borrow<dyn LabelValues + 'a> for SeriesKey {
    fn borrow(&self) -> &(dyn LabelValues + 'a) {
        &self.0
    }
}

/// Memoized `LabelSet -> Series` map.
#[derive(Debug, Default)]
pub struct SeriesStore {
    map: DashMap<SeriesKey, Arc<Series>>,
    seq: AtomicU64,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the series for `values`, building it with `make` on first use.
    /// The bool is true when this call created it. Only a miss allocates.
    pub fn get_or_create<F>(&self, values: &[&str], make: F) -> (Arc<Series>, bool)
    where
        F: FnOnce() -> Accumulator,
    {
        let borrowed: &dyn LabelValues = &values;
        if let Some(hit) = self.map.get(borrowed) {
            return (Arc::clone(hit.value()), false);
        }

        let key = SeriesKey(values.iter().map(|v| v.to_string()).collect());
        match self.map.entry(key) {
            // Lost the race to another creator between `get` and `entry`.
            Entry::Occupied(e) => (Arc::clone(e.get()), false),
            Entry::Vacant(e) => {
                let series = Arc::new(Series {
                    labels: LabelSet(e.key().0.clone()),
                    created_seq: self.seq.fetch_add(1, Ordering::Relaxed),
                    state: make(),
                });
                e.insert(Arc::clone(&series));
                (series, true)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All series in insertion order.
    pub fn ordered(&self) -> Vec<Arc<Series>> {
        let mut all: Vec<Arc<Series>> = self.map.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by_key(|s| s.created_seq);
        all
    }
}

/// Descriptor plus its series.
#[derive(Debug)]
pub struct MetricFamily {
    desc: MetricDescriptor,
    upper_bounds: Arc<[f64]>,
    store: SeriesStore,
    pub(crate) created_seq: u64,
}

impl MetricFamily {
    /// `desc` must already be validated.
    pub(crate) fn new(desc: MetricDescriptor, created_seq: u64) -> Self {
        let upper_bounds: Arc<[f64]> = Arc::from(desc.buckets.as_slice());
        Self {
            desc,
            upper_bounds,
            store: SeriesStore::new(),
            created_seq,
        }
    }

    pub fn descriptor(&self) -> &MetricDescriptor {
        &self.desc
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn kind(&self) -> MetricKind {
        self.desc.kind
    }

    /// Series for the given ordered label values, created on first access.
    pub fn labels(&self, values: &[&str]) -> Result<Arc<Series>> {
        let expected = self.desc.label_names.len();
        if values.len() != expected {
            return Err(MetricsError::LabelArity {
                name: self.desc.name.clone(),
                expected,
                actual: values.len(),
            });
        }

        let (series, created) = self.store.get_or_create(values, || {
            Accumulator::for_descriptor(&self.desc, &self.upper_bounds)
        });
        if created {
            tracing::debug!(family = %self.desc.name, labels = ?values, "series created");
        }
        Ok(series)
    }

    pub fn series_count(&self) -> usize {
        self.store.len()
    }

    pub fn series(&self) -> Vec<Arc<Series>> {
        self.store.ordered()
    }

    pub fn snapshot(&self) -> FamilySnapshot {
        FamilySnapshot {
            descriptor: self.desc.clone(),
            series: self
                .store
                .ordered()
                .into_iter()
                .map(|s| (s.labels.clone(), s.state.snapshot()))
                .collect(),
        }
    }
}

/// What the formatter consumes: descriptor plus series samples in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub descriptor: MetricDescriptor,
    pub series: Vec<(LabelSet, Sample)>,
}
