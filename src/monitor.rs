//! Periodic performance monitoring loop
//!
//! **Purpose:** Drive the whole governor: each tick pulls a snapshot from
//! the metrics source, appends it to the bounded history, re-runs the
//! analyzer over the retained window, feeds the snapshot to the alert
//! engine, and hands the combined load to the quality controller for
//! automatic adjustment.
//!
//! A failed stage is logged and skipped; the loop keeps ticking. There is no
//! retry policy, the next scheduled tick simply tries again.

use crate::alerts::{Alert, AlertEngine};
use crate::analysis::{AnalysisResult, PerformanceAnalyzer};
use crate::config::GovernorConfig;
use crate::engine::AudioEngine;
use crate::history::SampleHistory;
use crate::metrics::{MetricSnapshot, MetricsSource};
use crate::quality::{QualityController, QualityStatus};
use crate::store::SettingsStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Settings store key toggling automatic quality adjustment
pub const ADAPTIVE_MODE_KEY: &str = "adaptive_mode";

/// Settings store key overriding the monitoring tick interval
pub const UPDATE_INTERVAL_KEY: &str = "update_interval_ms";

/// Monitoring loop status for reports
#[derive(Debug, Clone, Serialize)]
pub struct MonitoringStatus {
    pub active: bool,
    pub interval_ms: u64,
    pub history_size: usize,
    pub auto_adjust: bool,
}

/// Alert state summary for reports
#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub active: Vec<Alert>,
    pub total_count: usize,
}

/// Aggregated governor state at one point in time
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub current: Option<MetricSnapshot>,
    pub analysis: AnalysisResult,
    pub monitoring: MonitoringStatus,
    pub alerts: AlertSummary,
    pub quality: QualityStatus,
}

/// Governor driver owning the sampling loop and all component state
pub struct PerformanceMonitor {
    interval_ms: AtomicU64,
    auto_adjust: AtomicBool,
    source: Mutex<Box<dyn MetricsSource>>,
    engine: Arc<dyn AudioEngine>,
    history: Mutex<SampleHistory>,
    analyzer: Mutex<PerformanceAnalyzer>,
    alerts: Mutex<AlertEngine>,
    quality: Arc<QualityController>,
    latest: Mutex<Option<MetricSnapshot>>,
    tick_task: Mutex<Option<JoinHandle<()>>>,
    interval_changed: Notify,
}

impl PerformanceMonitor {
    /// Build the monitor and its quality controller, and subscribe both to
    /// the settings store (quality key, adaptive-mode toggle, interval
    /// override).
    pub fn new(
        config: GovernorConfig,
        source: Box<dyn MetricsSource>,
        engine: Arc<dyn AudioEngine>,
        store: Arc<dyn SettingsStore>,
    ) -> Arc<Self> {
        let quality =
            QualityController::new(config.quality.clone(), Arc::clone(&engine), Arc::clone(&store));

        let monitor = Arc::new(Self {
            interval_ms: AtomicU64::new(config.monitor.update_interval_ms),
            auto_adjust: AtomicBool::new(config.quality.auto_adjust),
            source: Mutex::new(source),
            engine,
            history: Mutex::new(SampleHistory::new(
                config.monitor.max_history_size,
                config.monitor.analysis_window(),
            )),
            analyzer: Mutex::new(PerformanceAnalyzer::new()),
            alerts: Mutex::new(AlertEngine::new(config.alerts.clone())),
            quality,
            latest: Mutex::new(None),
            tick_task: Mutex::new(None),
            interval_changed: Notify::new(),
        });

        let weak = Arc::downgrade(&monitor);
        store.watch(
            ADAPTIVE_MODE_KEY,
            Arc::new(move |value, _origin| {
                if let (Some(monitor), Some(enabled)) = (weak.upgrade(), value.as_bool()) {
                    monitor.auto_adjust.store(enabled, Ordering::Relaxed);
                    info!(
                        "Automatic quality adjustment {}",
                        if enabled { "enabled" } else { "disabled" }
                    );
                }
            }),
        );

        let weak = Arc::downgrade(&monitor);
        store.watch(
            UPDATE_INTERVAL_KEY,
            Arc::new(move |value, _origin| {
                let (Some(monitor), Some(ms)) = (weak.upgrade(), value.as_u64()) else {
                    return;
                };
                if (10..=60_000).contains(&ms) {
                    monitor.interval_ms.store(ms, Ordering::Relaxed);
                    // Restart the pending sleep so the new cadence applies
                    // now, not after the old interval elapses
                    monitor.interval_changed.notify_one();
                    info!("Monitoring interval changed to {}ms", ms);
                } else {
                    warn!("Ignoring out-of-range monitoring interval: {}ms", ms);
                }
            }),
        );

        monitor
    }

    /// Start the monitoring tick task. Idempotent while already active.
    pub fn start(self: Arc<Self>) {
        let mut task = self.tick_task.lock().unwrap();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("Performance monitoring is already active");
            return;
        }

        info!(
            "Performance monitoring started (interval: {}ms)",
            self.interval_ms.load(Ordering::Relaxed)
        );

        let monitor = Arc::clone(&self);
        *task = Some(tokio::spawn(async move {
            loop {
                let interval = Duration::from_millis(monitor.interval_ms.load(Ordering::Relaxed));
                tokio::select! {
                    _ = sleep(interval) => monitor.run_tick(),
                    // Interval override: abandon the pending sleep and
                    // reschedule at the new cadence
                    _ = monitor.interval_changed.notified() => {}
                }
            }
        }));
    }

    /// One monitoring pass: sample, retain, analyze, alert, adjust
    fn run_tick(&self) {
        let now = Instant::now();
        let snapshot = self.source.lock().unwrap().sample();
        *self.latest.lock().unwrap() = Some(snapshot);

        let window = {
            let mut history = self.history.lock().unwrap();
            history.append(snapshot);
            history.window(None)
        };

        self.analyzer.lock().unwrap().analyze(&window);

        let fired = self
            .alerts
            .lock()
            .unwrap()
            .check(&snapshot, now, self.engine.as_ref());
        if !fired.is_empty() {
            debug!("{} new alert(s) raised this tick", fired.len());
        }

        if self.auto_adjust.load(Ordering::Relaxed) {
            if let Err(e) = self.quality.trigger_adjustment(snapshot.combined_load()) {
                warn!("Automatic quality adjustment failed: {}", e);
            }
        }
    }

    /// Stop the monitoring tick. An in-flight quality transition keeps
    /// running; use [`shutdown`](Self::shutdown) to cancel that too.
    pub fn stop(&self) {
        match self.tick_task.lock().unwrap().take() {
            Some(handle) => {
                handle.abort();
                info!("Performance monitoring stopped");
            }
            None => warn!("Performance monitoring is not active"),
        }
    }

    /// Stop monitoring, cancel any in-flight quality transition, and clear
    /// all retained state.
    pub fn shutdown(&self) {
        if self.is_active() {
            self.stop();
        }
        self.quality.shutdown();
        self.reset();
        info!("Performance monitor disposed");
    }

    /// Clear history, alerts, the cached snapshot, and the analysis result
    pub fn reset(&self) {
        self.history.lock().unwrap().clear();
        self.alerts.lock().unwrap().clear();
        self.analyzer.lock().unwrap().reset();
        *self.latest.lock().unwrap() = None;
        debug!("Performance monitor state reset");
    }

    pub fn is_active(&self) -> bool {
        self.tick_task
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn quality(&self) -> Arc<QualityController> {
        Arc::clone(&self.quality)
    }

    /// Most recent snapshot, if any tick has run
    pub fn latest_metrics(&self) -> Option<MetricSnapshot> {
        *self.latest.lock().unwrap()
    }

    pub fn analysis(&self) -> AnalysisResult {
        self.analyzer.lock().unwrap().result().clone()
    }

    /// Active alerts, newest first
    pub fn active_alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().active()
    }

    /// Retained history in insertion order, optionally only the last `n`
    pub fn history_window(&self, n: Option<usize>) -> Vec<MetricSnapshot> {
        self.history.lock().unwrap().window(n)
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    /// Aggregate everything into one serializable report
    pub fn report(&self) -> PerformanceReport {
        let alerts = self.active_alerts();
        PerformanceReport {
            generated_at: Utc::now(),
            current: self.latest_metrics(),
            analysis: self.analysis(),
            monitoring: MonitoringStatus {
                active: self.is_active(),
                interval_ms: self.interval_ms.load(Ordering::Relaxed),
                history_size: self.history_len(),
                auto_adjust: self.auto_adjust.load(Ordering::Relaxed),
            },
            alerts: AlertSummary {
                total_count: alerts.len(),
                active: alerts,
            },
            quality: self.quality.status(),
        }
    }
}
