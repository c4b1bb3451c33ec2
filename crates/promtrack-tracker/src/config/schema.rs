use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;
use promtrack_core::error::{MetricsError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Identifies this process; becomes the `name` label of tracked requests.
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    #[serde(default = "default_true")]
    pub start_server: bool,

    #[serde(default = "default_true")]
    pub collect_default_metrics: bool,

    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Also count requests in a separate `request_counter` family.
    #[serde(default)]
    pub track_request_count: bool,
}

impl TrackerConfig {
    /// Config with every optional field at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: default_port(),
            listen_host: default_listen_host(),
            start_server: true,
            collect_default_metrics: true,
            probe_interval_ms: default_probe_interval_ms(),
            track_request_count: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(MetricsError::BadConfig("name must not be empty".into()));
        }
        if !(1000..=600000).contains(&self.probe_interval_ms) {
            return Err(MetricsError::BadConfig(
                "probe_interval_ms must be between 1000 and 600000".into(),
            ));
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen_host.parse().map_err(|e| {
            MetricsError::BadConfig(format!(
                "listen_host {:?} is not an IP address: {e}",
                self.listen_host
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_port() -> u16 {
    9090
}
fn default_listen_host() -> String {
    "0.0.0.0".into()
}
fn default_true() -> bool {
    true
}
fn default_probe_interval_ms() -> u64 {
    5000
}
