//! promtrack core: metric families, label-indexed series, histogram buckets,
//! and the text exposition formatter.
//!
//! This crate carries no transport or runtime dependencies; the HTTP exporter,
//! runtime probe and configuration live in `promtrack-tracker`.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every caller
//! mistake (duplicate name, wrong label arity, negative delta, NaN
//! observation) surfaces as `MetricsError` on the violating call.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod accumulator;
pub mod descriptor;
pub mod error;
pub mod exposition;
pub mod family;
pub mod handle;
pub mod registry;

pub use descriptor::{MetricDescriptor, MetricKind, DEFAULT_BUCKETS};
/// Shared result type.
pub use error::{ErrorCode, MetricsError, Result};
pub use family::{FamilySnapshot, LabelSet, MetricFamily, Series};
pub use handle::{Counter, CounterVec, Gauge, GaugeVec, Histogram, HistogramTimer, HistogramVec};
pub use registry::MetricRegistry;
