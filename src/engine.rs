//! Audio engine collaborator interface
//!
//! The governor never touches the audio graph directly; it issues
//! fire-and-forget commands through this trait. Only `apply_quality` is
//! required. The remaining commands are optional capabilities with no-op
//! default bodies, so an engine that lacks one simply ignores the command
//! instead of erroring.

use serde::{Deserialize, Serialize};

/// Buffer sizing mode for latency optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSizeMode {
    LowLatency,
    Balanced,
    HighStability,
}

impl std::fmt::Display for BufferSizeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferSizeMode::LowLatency => write!(f, "low_latency"),
            BufferSizeMode::Balanced => write!(f, "balanced"),
            BufferSizeMode::HighStability => write!(f, "high_stability"),
        }
    }
}

/// Commands the governor can issue to the audio subsystem
///
/// All commands are best effort; there is no retry policy and failures stay
/// inside the implementation.
pub trait AudioEngine: Send + Sync {
    /// Apply a quality level in [0, 1]. The implementation clamps to
    /// whatever range it actually supports.
    fn apply_quality(&self, quality: f64);

    /// Step the engine down to its next cheaper quality preset
    fn reduce_quality(&self) {}

    /// Cap the number of simultaneously playing sounds
    fn limit_concurrent_sounds(&self, _limit: usize) {}

    /// Release decoded buffers that no active source references
    fn cleanup_unused_buffers(&self) {}

    /// Re-size processing buffers for the given mode
    fn adjust_buffer_size(&self, _mode: BufferSizeMode) {}

    /// Hint that now is a good moment for garbage collection
    fn hint_gc(&self) {}
}

/// Engine that accepts every command and does nothing
///
/// Useful as a stand-in when the governor runs without a real audio backend.
#[derive(Debug, Default)]
pub struct NullAudioEngine;

impl AudioEngine for NullAudioEngine {
    fn apply_quality(&self, _quality: f64) {}
}
