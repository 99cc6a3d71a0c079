//! Governor configuration
//!
//! All tunable parameters for the monitoring loop, the alert engine, and the
//! quality controller, with TOML file loading. Resolution order follows the
//! usual priority: explicit path from the command line, then the platform
//! config directory, then compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Monitoring loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Tick interval for metric sampling
    ///
    /// Valid range: [10, 60000] ms
    /// Default: 1000 ms
    pub update_interval_ms: u64,

    /// Maximum retained metric snapshots
    ///
    /// Valid range: [2, 10000]
    /// Default: 100
    pub max_history_size: usize,

    /// Retention window for snapshots; entries older than this are evicted
    ///
    /// Default: 30000 ms
    pub analysis_window_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            update_interval_ms: 1000,
            max_history_size: 100,
            analysis_window_ms: 30_000,
        }
    }
}

impl MonitorSettings {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn analysis_window(&self) -> Duration {
        Duration::from_millis(self.analysis_window_ms)
    }
}

/// Alert engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Normalized value above which a metric raises a warning alert
    ///
    /// Default: 0.7
    pub warning_threshold: f64,

    /// Normalized value above which a metric raises a critical alert
    ///
    /// Default: 0.9
    pub critical_threshold: f64,

    /// Minimum time between alert emissions, applied globally across metrics
    ///
    /// Default: 5000 ms
    pub cooldown_ms: u64,

    /// Age past which an alert record is dropped
    ///
    /// Default: 300000 ms (5 minutes)
    pub max_age_ms: u64,

    /// Cap on simultaneously active alert records; oldest evicted beyond this
    ///
    /// Default: 10
    pub max_active_alerts: usize,

    /// Dispatch auto-optimization commands on critical alerts
    ///
    /// Default: true
    pub adaptive_optimization: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            warning_threshold: 0.7,
            critical_threshold: 0.9,
            cooldown_ms: 5000,
            max_age_ms: 300_000,
            max_active_alerts: 10,
            adaptive_optimization: true,
        }
    }
}

impl AlertSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }
}

/// Named quality levels the controller interpolates between
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityLevels {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for QualityLevels {
    fn default() -> Self {
        Self {
            low: 0.25,
            medium: 0.6,
            high: 1.0,
        }
    }
}

/// Quality controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    /// Number of interpolation steps per transition
    ///
    /// Valid range: [1, 100]
    /// Default: 10
    pub adjustment_steps: u32,

    /// Delay between interpolation steps
    ///
    /// Default: 100 ms
    pub step_delay_ms: u64,

    /// Minimum requested delta; smaller requests are ignored as noise
    ///
    /// Default: 0.01
    pub deadband: f64,

    /// Minimum delta between candidate and current quality before an
    /// automatic adjustment fires, suppressing oscillation near thresholds
    ///
    /// Default: 0.1
    pub hysteresis: f64,

    /// Feed combined load into automatic quality adjustment each tick
    ///
    /// Default: true
    pub auto_adjust: bool,

    /// Combined load above which quality is stepped down
    ///
    /// Default: 0.8
    pub threshold_high: f64,

    /// Combined load below which quality is stepped up
    ///
    /// Default: 0.6
    pub threshold_medium: f64,

    /// Quality levels for the low/medium/high bands
    pub levels: QualityLevels,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            adjustment_steps: 10,
            step_delay_ms: 100,
            deadband: 0.01,
            hysteresis: 0.1,
            auto_adjust: true,
            threshold_high: 0.8,
            threshold_medium: 0.6,
            levels: QualityLevels::default(),
        }
    }
}

impl QualitySettings {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

/// Complete governor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    pub monitor: MonitorSettings,
    pub alerts: AlertSettings,
    pub quality: QualitySettings,
}

impl GovernorConfig {
    /// Load configuration from an explicit path, the platform config
    /// directory, or compiled defaults, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = path.map(PathBuf::from).or_else(default_config_file);

        let config = match candidate {
            Some(file) => {
                let text = std::fs::read_to_string(&file)?;
                toml::from_str(&text).map_err(|e| {
                    Error::Config(format!("failed to parse {}: {}", file.display(), e))
                })?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check parameter ranges before the governor starts
    pub fn validate(&self) -> Result<()> {
        if !(10..=60_000).contains(&self.monitor.update_interval_ms) {
            return Err(Error::Config(format!(
                "update_interval_ms out of range [10, 60000]: {}",
                self.monitor.update_interval_ms
            )));
        }
        if !(2..=10_000).contains(&self.monitor.max_history_size) {
            return Err(Error::Config(format!(
                "max_history_size out of range [2, 10000]: {}",
                self.monitor.max_history_size
            )));
        }
        if self.alerts.warning_threshold >= self.alerts.critical_threshold {
            return Err(Error::Config(format!(
                "warning_threshold {} must be below critical_threshold {}",
                self.alerts.warning_threshold, self.alerts.critical_threshold
            )));
        }
        if !(1..=100).contains(&self.quality.adjustment_steps) {
            return Err(Error::Config(format!(
                "adjustment_steps out of range [1, 100]: {}",
                self.quality.adjustment_steps
            )));
        }
        let levels = &self.quality.levels;
        for (name, value) in [
            ("low", levels.low),
            ("medium", levels.medium),
            ("high", levels.high),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "quality level {} out of range [0, 1]: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Platform config file, if one exists
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("audio-governor").join("config.toml"))
        .filter(|path| path.exists())
}
