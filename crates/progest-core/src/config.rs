use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ProgressError;

/// How the tracing sink renders a report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Progress reporting configuration loaded from `~/.config/progest/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Whether progress reporting runs at all.
    pub enabled: bool,
    /// Seconds between two progress reports (must be > 0).
    pub interval_secs: u32,
    /// Simulation-only run; the reporter never starts.
    pub dry_run: bool,
    /// Rendering of emitted reports: "text" (default) or "json".
    pub format: ReportFormat,
    /// Lower bound for the stall threshold in seconds. The threshold is
    /// max(stall_floor_secs, 2 * interval_secs).
    pub stall_floor_secs: u64,
    /// Number of instantaneous rate samples folded into the speed average.
    pub rate_window: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3,
            dry_run: false,
            format: ReportFormat::Text,
            stall_floor_secs: 5,
            rate_window: 30,
        }
    }
}

impl ProgressConfig {
    /// Reject values the estimator cannot work with.
    pub fn validate(&self) -> std::result::Result<(), ProgressError> {
        if self.interval_secs == 0 {
            return Err(ProgressError::InvalidInterval);
        }
        if self.rate_window == 0 {
            return Err(ProgressError::InvalidRateWindow);
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_secs))
    }

    /// Inactivity longer than this is reported as a stall.
    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_floor_secs).max(self.interval() * 2)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("progest")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ProgressConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ProgressConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<ProgressConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: ProgressConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
