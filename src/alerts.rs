//! Threshold alerting with dedup, cooldown, and aging
//!
//! **Purpose:** Evaluate each metric snapshot against warning/critical
//! thresholds, keep exactly one alert record per (metric, severity) pair,
//! rate-limit emission globally, and dispatch auto-optimization commands to
//! the audio engine on critical crossings.
//!
//! Alert lifecycle: absent, then active on the first crossing, updated in
//! place on repeat crossings, and finally dropped after `max_age` or when
//! evicted past the active-alert cap.

use crate::config::AlertSettings;
use crate::engine::{AudioEngine, BufferSizeMode};
use crate::metrics::MetricSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Metric a threshold alert can fire on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMetric {
    Cpu,
    Memory,
    Latency,
}

impl std::fmt::Display for AlertMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertMetric::Cpu => write!(f, "cpu"),
            AlertMetric::Memory => write!(f, "memory"),
            AlertMetric::Latency => write!(f, "latency"),
        }
    }
}

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// One active alert record, unique per (metric, severity)
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    /// Deterministic id: `<metric>_<severity>`
    pub id: String,
    pub metric: AlertMetric,
    pub severity: AlertSeverity,

    /// Normalized metric value at the most recent crossing
    pub value: f64,
    pub message: String,

    /// Monotonic timestamp of the most recent crossing (drives aging)
    #[serde(skip_serializing)]
    pub timestamp: Instant,

    /// Wall-clock time of the most recent crossing, for reporting
    pub raised_at: DateTime<Utc>,

    /// Crossings observed while this record has been active
    pub count: u32,
}

/// Threshold evaluation and alert bookkeeping
pub struct AlertEngine {
    settings: AlertSettings,
    alerts: HashMap<String, Alert>,
    last_alert: Option<Instant>,
}

impl AlertEngine {
    pub fn new(settings: AlertSettings) -> Self {
        Self {
            settings,
            alerts: HashMap::new(),
            last_alert: None,
        }
    }

    /// Evaluate a snapshot, returning only newly fired alerts.
    ///
    /// Emission is rate-limited by a single global cooldown: when the last
    /// emission is too recent, threshold evaluation is skipped outright for
    /// every metric. Aging still runs each call.
    pub fn check(
        &mut self,
        snapshot: &MetricSnapshot,
        now: Instant,
        engine: &dyn AudioEngine,
    ) -> Vec<Alert> {
        let cooled_down = self
            .last_alert
            .map_or(true, |last| now.duration_since(last) >= self.settings.cooldown());

        let mut fired = Vec::new();
        if cooled_down {
            self.check_metric(
                AlertMetric::Cpu,
                snapshot.cpu_usage,
                "CPU usage is too high",
                now,
                engine,
                &mut fired,
            );
            self.check_metric(
                AlertMetric::Memory,
                snapshot.memory_usage,
                "Memory usage is too high",
                now,
                engine,
                &mut fired,
            );
            // Latency is normalized against a 100ms budget before comparison
            self.check_metric(
                AlertMetric::Latency,
                snapshot.latency_ms / 100.0,
                "Audio latency is too high",
                now,
                engine,
                &mut fired,
            );
        }

        self.age(now);
        fired
    }

    /// Active alerts, newest first
    pub fn active(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.alerts.values().cloned().collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn last_alert(&self) -> Option<Instant> {
        self.last_alert
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
        self.last_alert = None;
    }

    fn check_metric(
        &mut self,
        metric: AlertMetric,
        value: f64,
        message: &str,
        now: Instant,
        engine: &dyn AudioEngine,
        fired: &mut Vec<Alert>,
    ) {
        let severity = if value > self.settings.critical_threshold {
            AlertSeverity::Critical
        } else if value > self.settings.warning_threshold {
            AlertSeverity::Warning
        } else {
            return;
        };

        let id = format!("{}_{}", metric, severity);
        if let Some(existing) = self.alerts.get_mut(&id) {
            // Repeat crossing: update in place, no re-emit, no re-dispatch
            existing.count += 1;
            existing.value = value;
            existing.timestamp = now;
            existing.raised_at = Utc::now();
            debug!(
                "Alert {} updated: value {:.2}, count {}",
                id, value, existing.count
            );
            return;
        }

        let alert = Alert {
            id: id.clone(),
            metric,
            severity,
            value,
            message: message.to_string(),
            timestamp: now,
            raised_at: Utc::now(),
            count: 1,
        };
        self.alerts.insert(id, alert.clone());
        self.last_alert = Some(now);

        warn!(
            "Performance alert: {} ({} {}, value {:.2})",
            alert.message, alert.metric, alert.severity, alert.value
        );

        if self.settings.adaptive_optimization && severity == AlertSeverity::Critical {
            self.dispatch_optimization(metric, engine);
        }

        fired.push(alert);
    }

    /// Auto-optimization commands, keyed by the metric that went critical
    fn dispatch_optimization(&self, metric: AlertMetric, engine: &dyn AudioEngine) {
        match metric {
            AlertMetric::Cpu => {
                engine.reduce_quality();
                engine.limit_concurrent_sounds(5);
            }
            AlertMetric::Memory => {
                engine.cleanup_unused_buffers();
                engine.hint_gc();
            }
            AlertMetric::Latency => {
                engine.adjust_buffer_size(BufferSizeMode::LowLatency);
            }
        }
        info!("Auto-optimization triggered for: {}", metric);
    }

    /// Drop expired records, then evict oldest-first past the active cap
    fn age(&mut self, now: Instant) {
        let max_age = self.settings.max_age();
        self.alerts
            .retain(|_, alert| now.duration_since(alert.timestamp) <= max_age);

        while self.alerts.len() > self.settings.max_active_alerts {
            let oldest = self
                .alerts
                .values()
                .min_by_key(|alert| alert.timestamp)
                .map(|alert| alert.id.clone());
            match oldest {
                Some(id) => {
                    self.alerts.remove(&id);
                }
                None => break,
            }
        }
    }
}
