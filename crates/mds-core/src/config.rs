use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of fetch attempts per job (including the first).
    pub max_attempts: u32,
    /// Fixed delay in seconds between attempts.
    pub backoff_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_secs: 10,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            backoff: Duration::from_secs(cfg.backoff_secs),
        }
    }
}

/// Global configuration loaded from `~/.config/mds/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdsConfig {
    /// TCP port the HTTP server binds.
    pub port: u16,
    /// Directory finished artifacts are written to (None = `~/Downloads`).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for MdsConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            download_dir: None,
            retry: None,
        }
    }
}

impl MdsConfig {
    /// Resolved output directory, falling back to `~/Downloads` (or a
    /// relative `downloads/` when no home directory is known).
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir.clone().unwrap_or_else(default_download_dir)
    }

    /// Effective retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.as_ref().map(RetryPolicy::from).unwrap_or_default()
    }

    /// Applies `MDS_PORT` / `MDS_DOWNLOAD_DIR` environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(port) = std::env::var("MDS_PORT").ok().and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Ok(dir) = std::env::var("MDS_DOWNLOAD_DIR") {
            if !dir.is_empty() {
                self.download_dir = Some(PathBuf::from(dir));
            }
        }
    }
}

fn default_download_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join("Downloads"),
        None => PathBuf::from("downloads"),
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("mds")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<MdsConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = MdsConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: MdsConfig = toml::from_str(&data)?;
    Ok(cfg)
}
