//! Periodic runtime probes.
//!
//! A probe registers its own families through the shared registry and
//! refreshes them on a fixed interval. Sampling failures are logged and the
//! loop keeps going; the next tick simply tries again.

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use promtrack_core::error::{MetricsError, Result};
use promtrack_core::{Gauge, MetricFamily, MetricRegistry};

#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;
    async fn sample(&self) -> Result<()>;
}

/// Run `probe` immediately and then every `every` until the task is aborted.
pub fn spawn_probe(probe: Arc<dyn Probe>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            if let Err(e) = probe.sample().await {
                tracing::warn!(probe = probe.name(), error = %e, "probe sample failed");
            }
        }
    })
}

/// Families registered by [`ProcessProbe`].
pub const PROCESS_GAUGES: [&str; 5] = [
    "process_start_time_seconds",
    "process_resident_memory_bytes",
    "process_virtual_memory_bytes",
    "process_threads",
    "process_open_fds",
];

/// Process gauges in the conventional `process_*` namespace.
///
/// Memory and thread figures come from `/proc/self/status`, descriptor counts
/// from `/proc/self/fd`. Where `/proc` is absent only the start time is set.
pub struct ProcessProbe {
    start_time_secs: f64,
    start_time: Gauge,
    resident_memory: Gauge,
    virtual_memory: Gauge,
    threads: Gauge,
    open_fds: Gauge,
}

impl ProcessProbe {
    /// Register the `process_*` gauges. All or nothing: if one name is
    /// taken, the gauges registered so far are removed again.
    pub fn register(registry: &MetricRegistry) -> Result<Self> {
        let mut registered = Vec::new();
        let probe = Self::register_into(registry, &mut registered);
        if probe.is_err() {
            for family in &registered {
                registry.unregister(family);
            }
        }
        probe
    }

    fn register_into(registry: &MetricRegistry, registered: &mut Vec<Arc<MetricFamily>>) -> Result<Self> {
        let [start_time, resident_memory, virtual_memory, threads, open_fds] = PROCESS_GAUGES;
        let mut gauge = |name: &str, help: &str| -> Result<Gauge> {
            let vec = registry.register_gauge(name, help, &[])?;
            registered.push(Arc::clone(vec.family()));
            vec.with_label_values(&[])
        };

        let start_time_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Ok(Self {
            start_time_secs,
            start_time: gauge(start_time, "Start time of the process since unix epoch in seconds.")?,
            resident_memory: gauge(resident_memory, "Resident memory size in bytes.")?,
            virtual_memory: gauge(virtual_memory, "Virtual memory size in bytes.")?,
            threads: gauge(threads, "Number of OS threads in the process.")?,
            open_fds: gauge(open_fds, "Number of open file descriptors.")?,
        })
    }
}

#[async_trait]
impl Probe for ProcessProbe {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn sample(&self) -> Result<()> {
        self.start_time.set(self.start_time_secs);

        if let Some(status) = read_optional("/proc/self/status").await? {
            let s = parse_status(&status);
            if let Some(v) = s.vm_rss_bytes {
                self.resident_memory.set(v as f64);
            }
            if let Some(v) = s.vm_size_bytes {
                self.virtual_memory.set(v as f64);
            }
            if let Some(v) = s.threads {
                self.threads.set(v as f64);
            }
        }

        if let Some(n) = count_open_fds().await? {
            self.open_fds.set(n as f64);
        }
        Ok(())
    }
}

async fn read_optional(path: &str) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MetricsError::Internal(format!("read {path} failed: {e}"))),
    }
}

async fn count_open_fds() -> Result<Option<usize>> {
    let mut dir = match tokio::fs::read_dir("/proc/self/fd").await {
        Ok(d) => d,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MetricsError::Internal(format!("read /proc/self/fd failed: {e}"))),
    };

    let mut n = 0;
    while let Some(_entry) = dir
        .next_entry()
        .await
        .map_err(|e| MetricsError::Internal(format!("read /proc/self/fd failed: {e}")))?
    {
        n += 1;
    }
    Ok(Some(n))
}

#[derive(Debug, Default, PartialEq)]
struct ProcStatus {
    vm_rss_bytes: Option<u64>,
    vm_size_bytes: Option<u64>,
    threads: Option<u64>,
}

/// Pick the few fields we export out of `/proc/<pid>/status`.
fn parse_status(s: &str) -> ProcStatus {
    let mut out = ProcStatus::default();
    for line in s.lines() {
        let Some((key, rest)) = line.split_once(':') else { continue; };
        let mut parts = rest.split_whitespace();
        let Some(value) = parts.next().and_then(|v| v.parse::<u64>().ok()) else { continue; };
        let scale = match parts.next() {
            Some("kB") => 1024,
            _ => 1,
        };
        match key {
            "VmRSS" => out.vm_rss_bytes = Some(value * scale),
            "VmSize" => out.vm_size_bytes = Some(value * scale),
            "Threads" => out.threads = Some(value),
            _ => {}
        }
    }
    out
}
