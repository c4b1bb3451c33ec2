//! Metric registry.
//!
//! Explicitly constructed and shared via `Arc`; there is no process-global
//! default, so tests can run several registries side by side. Families are
//! keyed by name and remember their registration order for deterministic
//! collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::descriptor::MetricDescriptor;
use crate::error::{MetricsError, Result};
use crate::exposition;
use crate::family::{FamilySnapshot, MetricFamily};
use crate::handle::{CounterVec, GaugeVec, HistogramVec};

#[derive(Debug, Default)]
pub struct MetricRegistry {
    families: DashMap<String, Arc<MetricFamily>>,
    seq: AtomicU64,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a family. Fails with `DuplicateName` if the name
    /// is taken; the existing family is left untouched.
    pub fn register(&self, mut desc: MetricDescriptor) -> Result<Arc<MetricFamily>> {
        desc.validate()?;

        match self.families.entry(desc.name.clone()) {
            Entry::Occupied(_) => {
                tracing::warn!(name = %desc.name, "metric already registered");
                Err(MetricsError::DuplicateName(desc.name))
            }
            Entry::Vacant(e) => {
                let seq = self.seq.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(name = %desc.name, kind = %desc.kind, labels = ?desc.label_names, "metric registered");
                let family = Arc::new(MetricFamily::new(desc, seq));
                e.insert(Arc::clone(&family));
                Ok(family)
            }
        }
    }

    pub fn register_counter(&self, name: &str, help: &str, label_names: &[&str]) -> Result<CounterVec> {
        CounterVec::new(self.register(MetricDescriptor::counter(name, help, label_names))?)
    }

    pub fn register_gauge(&self, name: &str, help: &str, label_names: &[&str]) -> Result<GaugeVec> {
        GaugeVec::new(self.register(MetricDescriptor::gauge(name, help, label_names))?)
    }

    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<HistogramVec> {
        HistogramVec::new(self.register(MetricDescriptor::histogram(
            name,
            help,
            label_names,
            buckets,
        ))?)
    }

    /// Remove `family` if it is still the one registered under its name.
    /// Used to undo partial registration; handles already given out keep
    /// working but are no longer collected.
    pub fn unregister(&self, family: &MetricFamily) -> bool {
        let removed = self
            .families
            .remove_if(family.name(), |_, f| std::ptr::eq(f.as_ref(), family))
            .is_some();
        if removed {
            tracing::debug!(name = %family.name(), "metric unregistered");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<MetricFamily>> {
        self.families.get(name).map(|r| Arc::clone(r.value()))
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Families in registration order.
    pub fn families(&self) -> Vec<Arc<MetricFamily>> {
        let mut all: Vec<Arc<MetricFamily>> =
            self.families.iter().map(|r| Arc::clone(r.value())).collect();
        all.sort_by_key(|f| f.created_seq);
        all
    }

    /// Best-effort snapshot: each series is read atomically, but different
    /// series may be read at slightly different times.
    pub fn collect(&self) -> Vec<FamilySnapshot> {
        self.families().iter().map(|f| f.snapshot()).collect()
    }

    /// Render the current state in the text exposition format.
    pub fn render(&self) -> String {
        exposition::render(&self.collect())
    }
}
