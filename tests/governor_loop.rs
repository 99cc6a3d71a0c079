//! End-to-end monitoring loop tests under paused tokio time.
//!
//! Each test wires a scripted metrics source and a recording engine into a
//! full `PerformanceMonitor` and lets the tick task run by sleeping; with
//! paused time the runtime auto-advances to each timer deadline, so tick
//! counts are deterministic.

use audio_governor::engine::{AudioEngine, BufferSizeMode};
use audio_governor::metrics::{MetricSnapshot, MetricsSource};
use audio_governor::store::{MemorySettings, SettingsStore, WriteOrigin};
use audio_governor::{Grade, GovernorConfig, PerformanceMonitor, QUALITY_KEY};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Metrics source whose load level the test can change mid-run
struct ScriptedLoad {
    load: Arc<Mutex<f64>>,
}

impl MetricsSource for ScriptedLoad {
    fn sample(&mut self) -> MetricSnapshot {
        let load = *self.load.lock().unwrap();
        MetricSnapshot {
            timestamp: Instant::now(),
            cpu_usage: load,
            memory_usage: 0.2,
            audio_processing_load: load * 0.9,
            active_audio_nodes: 4,
            buffer_underruns: 0,
            latency_ms: 20.0,
            frame_rate: 60.0,
        }
    }
}

#[derive(Default)]
struct RecordingEngine {
    applied: Mutex<Vec<f64>>,
    commands: Mutex<Vec<String>>,
}

impl AudioEngine for RecordingEngine {
    fn apply_quality(&self, quality: f64) {
        self.applied.lock().unwrap().push(quality);
    }

    fn reduce_quality(&self) {
        self.commands.lock().unwrap().push("reduce_quality".into());
    }

    fn limit_concurrent_sounds(&self, max: usize) {
        self.commands
            .lock()
            .unwrap()
            .push(format!("limit_concurrent_sounds({max})"));
    }

    fn cleanup_unused_buffers(&self) {
        self.commands.lock().unwrap().push("cleanup_unused_buffers".into());
    }

    fn adjust_buffer_size(&self, mode: BufferSizeMode) {
        self.commands
            .lock()
            .unwrap()
            .push(format!("adjust_buffer_size({mode})"));
    }
}

struct Fixture {
    monitor: Arc<PerformanceMonitor>,
    load: Arc<Mutex<f64>>,
    engine: Arc<RecordingEngine>,
    store: Arc<MemorySettings>,
}

fn fixture(config: GovernorConfig, initial_load: f64) -> Fixture {
    let load = Arc::new(Mutex::new(initial_load));
    let engine = Arc::new(RecordingEngine::default());
    let store = Arc::new(MemorySettings::new());
    let monitor = PerformanceMonitor::new(
        config,
        Box::new(ScriptedLoad {
            load: Arc::clone(&load),
        }),
        engine.clone(),
        store.clone(),
    );
    Fixture {
        monitor,
        load,
        engine,
        store,
    }
}

/// Config with the feedback paths disabled, for tests that only
/// exercise sampling and retention.
fn passive_config() -> GovernorConfig {
    let mut config = GovernorConfig::default();
    config.quality.auto_adjust = false;
    config.alerts.adaptive_optimization = false;
    config
}

#[tokio::test(start_paused = true)]
async fn history_is_bounded_by_capacity() {
    let mut config = passive_config();
    config.monitor.max_history_size = 5;
    let f = fixture(config, 0.4);

    f.monitor.clone().start();
    assert!(f.monitor.is_active());

    // 8 ticks at the default 1s interval
    sleep(Duration::from_millis(8_500)).await;

    assert_eq!(f.monitor.history_len(), 5);
    assert!(f.monitor.latest_metrics().is_some());
    assert_eq!(f.monitor.history_window(Some(3)).len(), 3);

    f.monitor.shutdown();
    assert!(!f.monitor.is_active());
}

#[tokio::test(start_paused = true)]
async fn repeated_overload_raises_one_deduplicated_alert() {
    let f = fixture(passive_config(), 0.95);

    f.monitor.clone().start();
    sleep(Duration::from_millis(10_500)).await;

    let alerts = f.monitor.active_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].id, "cpu_critical");
    // Fired on the first tick, then updated once per tick after the 5s
    // cooldown expired: ticks 6 through 10.
    assert_eq!(alerts[0].count, 6);

    // Optimization dispatch was disabled, so the engine saw nothing
    assert!(f.engine.commands.lock().unwrap().is_empty());

    f.monitor.shutdown();
}

#[tokio::test(start_paused = true)]
async fn critical_alert_dispatches_optimization_once() {
    let mut config = passive_config();
    config.alerts.adaptive_optimization = true;
    let f = fixture(config, 0.95);

    f.monitor.clone().start();
    sleep(Duration::from_millis(10_500)).await;

    // Repeat crossings update the alert but never re-dispatch
    let commands = f.engine.commands.lock().unwrap().clone();
    assert_eq!(
        commands,
        vec!["reduce_quality".to_string(), "limit_concurrent_sounds(5)".to_string()]
    );

    f.monitor.shutdown();
}

#[tokio::test(start_paused = true)]
async fn quality_follows_load() {
    let f = fixture(GovernorConfig::default(), 0.95);
    let quality = f.monitor.quality();
    assert!((quality.current_quality() - 1.0).abs() < 1e-9);

    f.monitor.clone().start();
    // Overloaded: first tick requests the low level, the 10-step fade
    // finishes well inside the next tick.
    sleep(Duration::from_millis(3_500)).await;
    assert!((quality.current_quality() - 0.25).abs() < 1e-9);
    assert_eq!(f.store.get_f64(QUALITY_KEY), Some(0.25));

    // Recovered: near-idle load walks quality back up to high
    *f.load.lock().unwrap() = 0.1;
    sleep(Duration::from_millis(3_500)).await;
    assert!((quality.current_quality() - 1.0).abs() < 1e-9);

    let applied = f.engine.applied.lock().unwrap();
    assert_eq!(applied.len(), 20);
    f.monitor.shutdown();
}

#[tokio::test(start_paused = true)]
async fn adaptive_mode_toggle_via_store() {
    let f = fixture(GovernorConfig::default(), 0.95);
    f.store
        .set("adaptive_mode", json!(false), WriteOrigin::External);

    f.monitor.clone().start();
    sleep(Duration::from_millis(3_500)).await;
    assert!((f.monitor.quality().current_quality() - 1.0).abs() < 1e-9);

    f.store
        .set("adaptive_mode", json!(true), WriteOrigin::External);
    sleep(Duration::from_millis(3_500)).await;
    assert!((f.monitor.quality().current_quality() - 0.25).abs() < 1e-9);

    f.monitor.shutdown();
}

#[tokio::test(start_paused = true)]
async fn interval_override_via_store() {
    let f = fixture(passive_config(), 0.4);
    f.store
        .set("update_interval_ms", json!(250), WriteOrigin::External);

    f.monitor.clone().start();
    sleep(Duration::from_millis(1_050)).await;
    assert_eq!(f.monitor.history_len(), 4);

    // Out-of-range values are ignored and the current interval kept
    f.store
        .set("update_interval_ms", json!(0), WriteOrigin::External);
    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(f.monitor.history_len(), 8);

    f.monitor.shutdown();
}

#[tokio::test(start_paused = true)]
async fn interval_change_takes_effect_mid_sleep() {
    let f = fixture(passive_config(), 0.4);

    f.monitor.clone().start();
    // 100ms into the default 1s sleep, shorten the interval. The pending
    // sleep is abandoned, so ticks land at 350/600/850ms rather than
    // waiting out the original deadline at 1s.
    sleep(Duration::from_millis(100)).await;
    f.store
        .set("update_interval_ms", json!(250), WriteOrigin::External);
    sleep(Duration::from_millis(800)).await;
    assert_eq!(f.monitor.history_len(), 3);

    f.monitor.shutdown();
}

#[tokio::test(start_paused = true)]
async fn report_summarizes_current_state() {
    let f = fixture(GovernorConfig::default(), 0.95);

    f.monitor.clone().start();
    sleep(Duration::from_millis(6_500)).await;

    let report = f.monitor.report();
    assert!(report.monitoring.active);
    assert_eq!(report.monitoring.interval_ms, 1_000);
    assert!(report.monitoring.auto_adjust);
    assert!(report.current.is_some());
    // Constant 0.95 load: graded F with perfect stability
    assert_eq!(report.analysis.grade, Grade::F);
    assert!((report.analysis.average_load - 0.95).abs() < 1e-9);
    assert!((report.analysis.stability_score - 1.0).abs() < 1e-9);
    assert_eq!(report.alerts.total_count, 1);
    assert!((report.quality.current - 0.25).abs() < 1e-9);

    f.monitor.shutdown();
    let report = f.monitor.report();
    assert!(!report.monitoring.active);
    assert_eq!(report.monitoring.history_size, 0);
    assert_eq!(report.alerts.total_count, 0);
    assert!(report.current.is_none());
}
