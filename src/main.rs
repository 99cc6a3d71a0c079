//! Audio governor demo binary
//!
//! **Purpose:** Run the governor against a synthetic load source so the
//! monitoring loop, alert engine, and quality controller can be observed
//! from the log output without a real audio engine attached.

use anyhow::Context;
use audio_governor::engine::{AudioEngine, BufferSizeMode};
use audio_governor::metrics::{MetricSnapshot, MetricsSource};
use audio_governor::store::MemorySettings;
use audio_governor::{GovernorConfig, PerformanceMonitor, SettingsStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "audio-governor")]
#[command(about = "Adaptive audio performance governor demo")]
struct Args {
    /// Path to config file (default: platform config dir)
    #[arg(short, long, env = "AUDIO_GOVERNOR_CONFIG")]
    config: Option<PathBuf>,

    /// Override the monitoring tick interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Seconds between summary reports on stdout logging
    #[arg(long, default_value_t = 10)]
    report_secs: u64,
}

/// Audio engine that only logs what it is told to do
struct LogAudioEngine;

impl AudioEngine for LogAudioEngine {
    fn apply_quality(&self, quality: f64) {
        debug!("Engine quality set to {:.3}", quality);
    }

    fn reduce_quality(&self) {
        info!("Engine asked to reduce quality");
    }

    fn limit_concurrent_sounds(&self, max: usize) {
        info!("Engine limited to {} concurrent sounds", max);
    }

    fn cleanup_unused_buffers(&self) {
        info!("Engine asked to release unused buffers");
    }

    fn adjust_buffer_size(&self, mode: BufferSizeMode) {
        info!("Engine buffer mode set to {}", mode);
    }
}

/// Deterministic load generator: a slow sine wave over CPU and audio load
/// with slowly creeping memory, enough to exercise every quality band.
#[derive(Default)]
struct SyntheticLoadSource {
    tick: u64,
}

impl MetricsSource for SyntheticLoadSource {
    fn sample(&mut self) -> MetricSnapshot {
        self.tick += 1;
        let phase = self.tick as f64 / 30.0 * std::f64::consts::TAU;
        let wave = 0.5 + 0.45 * phase.sin();
        MetricSnapshot {
            timestamp: Instant::now(),
            cpu_usage: wave,
            memory_usage: (0.3 + 0.005 * self.tick as f64).min(0.85),
            audio_processing_load: wave * 0.8,
            active_audio_nodes: 4 + (wave * 16.0) as u32,
            buffer_underruns: self.tick / 40,
            latency_ms: 15.0 + wave * 50.0,
            frame_rate: 62.0 - wave * 12.0,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config =
        GovernorConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(ms) = args.interval_ms {
        config.monitor.update_interval_ms = ms;
    }
    config.validate().context("Invalid configuration")?;

    let store: Arc<dyn SettingsStore> = Arc::new(MemorySettings::new());
    let monitor = PerformanceMonitor::new(
        config,
        Box::new(SyntheticLoadSource::default()),
        Arc::new(LogAudioEngine),
        Arc::clone(&store),
    );
    monitor.clone().start();
    info!("Audio governor running, press Ctrl+C to stop");

    let mut report_timer = tokio::time::interval(Duration::from_secs(args.report_secs.max(1)));
    report_timer.tick().await; // first interval tick fires immediately
    loop {
        tokio::select! {
            _ = report_timer.tick() => {
                let report = monitor.report();
                info!(
                    "grade {} | avg load {:.2} | stability {:.2} | {} active alert(s) | quality {:.2}",
                    report.analysis.grade,
                    report.analysis.average_load,
                    report.analysis.stability_score,
                    report.alerts.total_count,
                    report.quality.current,
                );
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for shutdown signal")?;
                break;
            }
        }
    }

    info!("Shutting down");
    monitor.shutdown();
    Ok(())
}
