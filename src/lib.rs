//! Adaptive audio performance governor
//!
//! **Purpose:** Keep game audio smooth under load. The governor samples
//! runtime metrics on a fixed tick, retains a bounded history, grades the
//! recent window, raises deduplicated alerts when thresholds are crossed,
//! and steps the audio quality level up or down through an [`AudioEngine`]
//! so transitions are audible as fades rather than jumps.
//!
//! Typical wiring:
//!
//! ```no_run
//! use audio_governor::{
//!     GovernorConfig, MemorySettings, NullAudioEngine, PerformanceMonitor,
//! };
//! use audio_governor::metrics::{MetricSnapshot, MetricsSource};
//! use std::sync::Arc;
//!
//! struct Probe;
//! impl MetricsSource for Probe {
//!     fn sample(&mut self) -> MetricSnapshot {
//!         MetricSnapshot {
//!             timestamp: tokio::time::Instant::now(),
//!             cpu_usage: 0.3,
//!             memory_usage: 0.4,
//!             audio_processing_load: 0.2,
//!             active_audio_nodes: 8,
//!             buffer_underruns: 0,
//!             latency_ms: 25.0,
//!             frame_rate: 60.0,
//!         }
//!     }
//! }
//!
//! # async fn run() {
//! let monitor = PerformanceMonitor::new(
//!     GovernorConfig::default(),
//!     Box::new(Probe),
//!     Arc::new(NullAudioEngine),
//!     Arc::new(MemorySettings::new()),
//! );
//! monitor.clone().start();
//! # }
//! ```

pub mod alerts;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;
pub mod monitor;
pub mod quality;
pub mod store;

pub use alerts::{Alert, AlertEngine, AlertMetric, AlertSeverity};
pub use analysis::{AnalysisResult, Grade, PerformanceAnalyzer, RecommendedAction, Severity};
pub use config::{AlertSettings, GovernorConfig, MonitorSettings, QualitySettings};
pub use engine::{AudioEngine, BufferSizeMode, NullAudioEngine};
pub use error::{Error, Result};
pub use history::SampleHistory;
pub use metrics::{MetricSnapshot, MetricsSource};
pub use monitor::{PerformanceMonitor, PerformanceReport};
pub use quality::{QualityController, QualityStatus, QUALITY_KEY};
pub use store::{MemorySettings, SettingsStore, WriteOrigin};
