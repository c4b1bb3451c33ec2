//! Request tracker facade.
//!
//! Owns the response-time histogram for one named process and hands out
//! ad-hoc families, all registered against one shared registry. `start`
//! additionally brings up the HTTP exporter and the process probe.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use promtrack_core::error::Result;
use promtrack_core::{CounterVec, GaugeVec, HistogramVec, MetricRegistry, DEFAULT_BUCKETS};

use crate::config::TrackerConfig;
use crate::exporter;
use crate::probe::{spawn_probe, ProcessProbe};

pub const RESPONSE_TIME_HISTOGRAM: &str = "response_time_histogram";
pub const REQUEST_COUNTER: &str = "request_counter";

const REQUEST_LABELS: [&str; 4] = ["name", "uri", "method", "status"];

/// Seconds as a float, nanosecond precision.
pub fn duration_to_seconds(d: Duration) -> f64 {
    d.as_secs_f64()
}

/// Total of several spans, in seconds.
pub fn sum_durations(spans: &[Duration]) -> f64 {
    duration_to_seconds(spans.iter().sum())
}

pub struct Tracker {
    cfg: TrackerConfig,
    registry: Arc<MetricRegistry>,
    response_time: HistogramVec,
    request_counter: Option<CounterVec>,
}

impl Tracker {
    /// Register the tracker's families. No background work is started.
    /// On error nothing stays registered.
    pub fn new(cfg: TrackerConfig, registry: Arc<MetricRegistry>) -> Result<Self> {
        cfg.validate()?;

        let response_time = registry.register_histogram(
            RESPONSE_TIME_HISTOGRAM,
            "Response time histogram",
            &REQUEST_LABELS,
            &DEFAULT_BUCKETS,
        )?;

        let request_counter = if cfg.track_request_count {
            match registry.register_counter(REQUEST_COUNTER, "Counter of all requests", &REQUEST_LABELS) {
                Ok(c) => Some(c),
                Err(e) => {
                    registry.unregister(response_time.family());
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(Self {
            cfg,
            registry,
            response_time,
            request_counter,
        })
    }

    /// `new`, then the exporter (if `start_server`) and the process probe
    /// (if `collect_default_metrics`). Must run inside a tokio runtime.
    /// A failed start leaves the registry as it found it.
    pub async fn start(cfg: TrackerConfig, registry: Arc<MetricRegistry>) -> Result<(Self, TrackerTasks)> {
        let tracker = Self::new(cfg, registry)?;
        match tracker.spawn_tasks().await {
            Ok(tasks) => Ok((tracker, tasks)),
            Err(e) => {
                tracing::warn!(name = %tracker.cfg.name, error = %e, "tracker start failed");
                tracker.unregister();
                Err(e)
            }
        }
    }

    async fn spawn_tasks(&self) -> Result<TrackerTasks> {
        // Bind and register before spawning; the probe undoes its own
        // partial registration, the caller undoes the tracker's.
        let listener = if self.cfg.start_server {
            Some(exporter::bind(self.cfg.listen_addr()?).await?)
        } else {
            None
        };
        let probe = if self.cfg.collect_default_metrics {
            Some(ProcessProbe::register(&self.registry)?)
        } else {
            None
        };

        let mut tasks = TrackerTasks::default();

        if let Some(listener) = listener {
            let addr = listener.local_addr().ok();
            tracing::info!(name = %self.cfg.name, addr = ?addr, "metrics exporter listening");
            tasks.local_addr = addr;
            tasks.exporter = Some(exporter::serve(listener, Arc::clone(&self.registry)));
        }

        if let Some(probe) = probe {
            let every = Duration::from_millis(self.cfg.probe_interval_ms);
            tracing::info!(interval_ms = self.cfg.probe_interval_ms, "process probe started");
            tasks.probe = Some(spawn_probe(Arc::new(probe), every));
        }

        Ok(tasks)
    }

    fn unregister(&self) {
        self.registry.unregister(self.response_time.family());
        if let Some(counter) = &self.request_counter {
            self.registry.unregister(counter.family());
        }
    }

    /// Observe one request into `response_time_histogram` under
    /// `(name, uri, method, status)`.
    pub fn track_request(&self, uri: &str, method: &str, status_code: u16, seconds: f64) -> Result<()> {
        let status = status_code.to_string();
        let labels = [self.cfg.name.as_str(), uri, method, status.as_str()];

        self.response_time.with_label_values(&labels)?.observe(seconds)?;
        if let Some(counter) = &self.request_counter {
            counter.with_label_values(&labels)?.inc();
        }
        Ok(())
    }

    pub fn track_duration(&self, uri: &str, method: &str, status_code: u16, elapsed: Duration) -> Result<()> {
        self.track_request(uri, method, status_code, duration_to_seconds(elapsed))
    }

    pub fn create_counter(&self, name: &str, help: &str, label_names: &[&str]) -> Result<CounterVec> {
        self.registry.register_counter(name, help, label_names)
    }

    pub fn create_gauge(&self, name: &str, help: &str, label_names: &[&str]) -> Result<GaugeVec> {
        self.registry.register_gauge(name, help, label_names)
    }

    pub fn create_histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<HistogramVec> {
        self.registry.register_histogram(name, help, label_names, buckets)
    }

    /// Current exposition text, same as a scrape body.
    pub fn metrics(&self) -> String {
        self.registry.render()
    }

    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    pub fn registry(&self) -> &Arc<MetricRegistry> {
        &self.registry
    }

    pub fn response_time(&self) -> &HistogramVec {
        &self.response_time
    }
}

/// Background tasks started by [`Tracker::start`].
#[derive(Debug, Default)]
pub struct TrackerTasks {
    local_addr: Option<SocketAddr>,
    exporter: Option<JoinHandle<()>>,
    probe: Option<JoinHandle<()>>,
}

impl TrackerTasks {
    /// Address the exporter actually bound (useful with port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn exporter_running(&self) -> bool {
        self.exporter.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn probe_running(&self) -> bool {
        self.probe.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn shutdown(self) {
        if let Some(h) = self.exporter {
            h.abort();
        }
        if let Some(h) = self.probe {
            h.abort();
        }
        tracing::info!("tracker tasks stopped");
    }
}
