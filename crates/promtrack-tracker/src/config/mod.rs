//! Tracker configuration.
//!
//! YAML is parsed strictly (`deny_unknown_fields`) and validated before a
//! `TrackerConfig` is handed out. The binary locates its file through
//! `$PROMTRACK_CONFIG`, falling back to `promtrack.yaml` in the working
//! directory.

pub mod schema;

use std::path::{Path, PathBuf};

use promtrack_core::error::{MetricsError, Result};

pub use schema::TrackerConfig;

pub const CONFIG_ENV: &str = "PROMTRACK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "promtrack.yaml";

/// Config path from an optional override; blank overrides are ignored.
pub fn resolve_path(env_value: Option<String>) -> PathBuf {
    env_value
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load from `$PROMTRACK_CONFIG` or the default path.
pub fn load() -> Result<TrackerConfig> {
    load_from_file(resolve_path(std::env::var(CONFIG_ENV).ok()))
}

/// Read and validate one file. Read failures are `Internal`, bad content is
/// `BadConfig`; both name the file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<TrackerConfig> {
    let path = path.as_ref();
    let s = std::fs::read_to_string(path)
        .map_err(|e| MetricsError::Internal(format!("read config {} failed: {e}", path.display())))?;

    let cfg = load_from_str(&s).map_err(|e| match e {
        MetricsError::BadConfig(msg) => MetricsError::BadConfig(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::info!(path = %path.display(), name = %cfg.name, "config loaded");
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<TrackerConfig> {
    let cfg: TrackerConfig =
        serde_yaml::from_str(s).map_err(|e| MetricsError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
