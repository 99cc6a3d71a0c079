//! Metric snapshot type and the sampling collaborator
//!
//! **Purpose:** One `MetricSnapshot` is pulled from the `MetricsSource` per
//! monitoring tick and then owned by the history buffer. How the raw values
//! are measured is the source's concern; the governor only consumes them.

use serde::Serialize;
use tokio::time::Instant;

/// Single observation of audio subsystem load
///
/// All fractional metrics are normalized to [0, 1]. `buffer_underruns` is a
/// monotonic counter, not a per-tick delta. Immutable after creation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricSnapshot {
    /// Monotonic sampling instant (drives age-based history eviction)
    #[serde(skip_serializing)]
    pub timestamp: Instant,

    /// CPU usage fraction in [0, 1]
    pub cpu_usage: f64,

    /// Memory usage fraction in [0, 1]
    pub memory_usage: f64,

    /// Audio processing load fraction in [0, 1]
    pub audio_processing_load: f64,

    /// Currently active audio graph nodes
    pub active_audio_nodes: u32,

    /// Total buffer underrun events since startup
    pub buffer_underruns: u64,

    /// Output latency in milliseconds
    pub latency_ms: f64,

    /// Rendering frame rate in frames per second
    pub frame_rate: f64,
}

impl MetricSnapshot {
    /// Combined load: the worst of CPU, audio processing, and memory.
    ///
    /// This is the single scalar the analyzer averages and the quality
    /// controller bands on.
    pub fn combined_load(&self) -> f64 {
        self.cpu_usage
            .max(self.audio_processing_load)
            .max(self.memory_usage)
    }
}

/// Supplier of metric snapshots, called once per monitoring tick
pub trait MetricsSource: Send {
    fn sample(&mut self) -> MetricSnapshot;
}
