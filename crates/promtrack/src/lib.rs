//! Top-level facade crate for promtrack.
//!
//! Re-exports the metric core and the tracker library so users can depend on a single crate.

pub mod core {
    pub use promtrack_core::*;
}

pub mod tracker {
    pub use promtrack_tracker::*;
}

pub use promtrack_core::{MetricRegistry, MetricsError, Result};
pub use promtrack_tracker::{Tracker, TrackerConfig};
