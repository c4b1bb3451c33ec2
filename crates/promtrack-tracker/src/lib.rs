//! promtrack tracker library entry.
//!
//! Wires the core registry to its outer collaborators: strict YAML config,
//! the request `Tracker` facade, the scrape exporter, and the periodic
//! process probe. Consumed by the binary (`main.rs`) and by integration tests.

pub mod config;
pub mod exporter;
pub mod probe;
pub mod tracker;

pub use config::TrackerConfig;
pub use tracker::{Tracker, TrackerTasks};
