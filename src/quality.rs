//! Stepped audio quality transitions
//!
//! **Purpose:** Move the audio quality level toward a requested target over
//! discrete interpolation steps, applying each intermediate value to the
//! audio engine, and persist the final value to the shared settings store.
//!
//! # Transition policy
//!
//! - A request within the deadband of the current level is ignored as noise.
//! - A request arriving while a transition is in flight is dropped, not
//!   queued. A rapid double request therefore loses the second intent; that
//!   is the documented behavior, and callers can observe the drop through
//!   the `Ok(false)` return.
//! - Automatic adjustments derived from load apply a wider hysteresis band
//!   on top of the deadband, so load hovering around a threshold does not
//!   make the quality level oscillate.
//!
//! # Re-entrancy
//!
//! The controller persists the final value tagged `WriteOrigin::SelfPersist`
//! and its own store watcher ignores writes with that tag, so the
//! persist -> notify -> request cycle terminates after one lap. External
//! writes to the quality key flow back in as ordinary requests.

use crate::config::QualitySettings;
use crate::engine::AudioEngine;
use crate::store::{SettingsStore, WriteOrigin};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Settings store key holding the persisted quality level
pub const QUALITY_KEY: &str = "audio_quality";

/// Load above which the controller drops straight to the low level
const OVERLOAD_LOAD: f64 = 0.9;

/// Load below which the controller climbs to the high level
const IDLE_LOAD: f64 = 0.3;

/// Observable controller state
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QualityStatus {
    pub current: f64,
    pub target: f64,
    pub in_progress: bool,
}

#[derive(Debug)]
struct State {
    current: f64,
    target: f64,
    in_progress: bool,
}

/// Guarded quality transition state machine
///
/// Shared state lives behind an `Arc` so the step task spawned for a
/// transition can complete it after `request_quality` has returned.
pub struct QualityController {
    settings: QualitySettings,
    state: Arc<Mutex<State>>,
    engine: Arc<dyn AudioEngine>,
    store: Arc<dyn SettingsStore>,
    transition: Mutex<Option<JoinHandle<()>>>,
}

impl QualityController {
    /// Create the controller and subscribe it to external quality changes.
    ///
    /// The initial level comes from the store when present, otherwise the
    /// configured high level.
    pub fn new(
        settings: QualitySettings,
        engine: Arc<dyn AudioEngine>,
        store: Arc<dyn SettingsStore>,
    ) -> Arc<Self> {
        let initial = store
            .get_f64(QUALITY_KEY)
            .unwrap_or(settings.levels.high)
            .clamp(0.0, 1.0);

        let controller = Arc::new(Self {
            settings,
            state: Arc::new(Mutex::new(State {
                current: initial,
                target: initial,
                in_progress: false,
            })),
            engine,
            store: Arc::clone(&store),
            transition: Mutex::new(None),
        });

        // Accept externally-driven quality changes. Writes tagged as this
        // controller's own persist are ignored, which is what keeps the
        // persist -> notify cycle from looping.
        let weak = Arc::downgrade(&controller);
        store.watch(
            QUALITY_KEY,
            Arc::new(move |value, origin| {
                if origin == WriteOrigin::SelfPersist {
                    return;
                }
                let Some(controller) = weak.upgrade() else {
                    return;
                };
                match value.as_f64() {
                    Some(quality) => {
                        if let Err(e) = controller.request_quality(quality) {
                            warn!("Rejected external quality change: {}", e);
                        }
                    }
                    None => warn!("Ignoring non-numeric quality setting: {}", value),
                }
            }),
        );

        controller
    }

    /// Request a transition to `target`.
    ///
    /// Returns `Ok(true)` when a transition starts, `Ok(false)` when the
    /// request is dropped (already transitioning, or within the deadband),
    /// and `Err(Error::InvalidQuality)` for a target outside [0, 1], which
    /// leaves state untouched.
    ///
    /// Must be called from within a tokio runtime; the interpolation runs on
    /// a spawned task whose inter-step sleeps are its only yield points.
    pub fn request_quality(&self, target: f64) -> Result<bool> {
        if !(0.0..=1.0).contains(&target) {
            return Err(Error::InvalidQuality(target));
        }

        let current = {
            let mut state = self.state.lock().unwrap();
            if state.in_progress {
                debug!(
                    "Quality request {:.2} dropped: transition to {:.2} in progress",
                    target, state.target
                );
                return Ok(false);
            }
            if (target - state.current).abs() < self.settings.deadband {
                return Ok(false);
            }
            state.in_progress = true;
            state.target = target;
            state.current
        };

        let steps = self.settings.adjustment_steps;
        let step_delay = self.settings.step_delay();
        debug!(
            "Adjusting audio quality: {:.2} -> {:.2} over {} steps",
            current, target, steps
        );

        let state = Arc::clone(&self.state);
        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move {
            let step_size = (target - current) / f64::from(steps);
            for step in 1..=steps {
                let intermediate = current + step_size * f64::from(step);
                engine.apply_quality(intermediate);
                if step < steps {
                    sleep(step_delay).await;
                }
            }

            state.lock().unwrap().current = target;
            store.set(QUALITY_KEY, json!(target), WriteOrigin::SelfPersist);
            state.lock().unwrap().in_progress = false;
            info!("Audio quality adjustment completed: {:.2}", target);
        });
        *self.transition.lock().unwrap() = Some(handle);

        Ok(true)
    }

    /// Derive a quality target from the combined load and request it.
    ///
    /// Load bands: above `threshold_high` the candidate is medium, or low
    /// past the overload point; below `threshold_medium` the candidate is
    /// medium, or high once the system is nearly idle. The candidate is only
    /// requested when it differs from the current level by more than the
    /// hysteresis band.
    pub fn trigger_adjustment(&self, load: f64) -> Result<bool> {
        let current = {
            let state = self.state.lock().unwrap();
            if state.in_progress {
                return Ok(false);
            }
            state.current
        };

        let levels = &self.settings.levels;
        let candidate = if load > self.settings.threshold_high {
            if load > OVERLOAD_LOAD {
                levels.low
            } else {
                levels.medium
            }
        } else if load < self.settings.threshold_medium {
            if load < IDLE_LOAD {
                levels.high
            } else {
                levels.medium
            }
        } else {
            current
        };

        if (candidate - current).abs() > self.settings.hysteresis {
            debug!(
                "Load {:.2} outside comfort band, requesting quality {:.2}",
                load, candidate
            );
            self.request_quality(candidate)
        } else {
            Ok(false)
        }
    }

    pub fn status(&self) -> QualityStatus {
        let state = self.state.lock().unwrap();
        QualityStatus {
            current: state.current,
            target: state.target,
            in_progress: state.in_progress,
        }
    }

    pub fn current_quality(&self) -> f64 {
        self.state.lock().unwrap().current
    }

    pub fn in_progress(&self) -> bool {
        self.state.lock().unwrap().in_progress
    }

    /// Wait for the most recently started transition to finish
    pub async fn await_transition(&self) {
        let handle = self.transition.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Cancel any in-flight transition.
    ///
    /// A cancelled transition is not persisted and `current` keeps its
    /// pre-transition value; the engine is left at the last applied
    /// intermediate level.
    pub fn shutdown(&self) {
        if let Some(handle) = self.transition.lock().unwrap().take() {
            if !handle.is_finished() {
                handle.abort();
                info!("In-flight quality transition cancelled");
            }
        }
        self.state.lock().unwrap().in_progress = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySettings;

    #[derive(Default)]
    struct RecordingEngine {
        applied: Mutex<Vec<f64>>,
    }

    impl AudioEngine for RecordingEngine {
        fn apply_quality(&self, quality: f64) {
            self.applied.lock().unwrap().push(quality);
        }
    }

    fn controller() -> (Arc<QualityController>, Arc<RecordingEngine>) {
        let engine = Arc::new(RecordingEngine::default());
        let store = Arc::new(MemorySettings::new());
        let controller = QualityController::new(
            QualitySettings::default(),
            engine.clone(),
            store,
        );
        (controller, engine)
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_is_rejected() {
        let (controller, _engine) = controller();
        let before = controller.current_quality();

        assert!(matches!(
            controller.request_quality(1.5),
            Err(Error::InvalidQuality(_))
        ));
        assert!(matches!(
            controller.request_quality(-0.1),
            Err(Error::InvalidQuality(_))
        ));
        assert_eq!(controller.current_quality(), before);
        assert!(!controller.in_progress());
    }

    #[tokio::test(start_paused = true)]
    async fn deadband_drops_tiny_requests() {
        let (controller, engine) = controller();
        let current = controller.current_quality();
        assert_eq!(current, 1.0);

        // Just inside the 0.01 deadband, approached from below so the
        // request is in range
        assert!(!controller.request_quality(current - 0.005).unwrap());
        assert!(!controller.in_progress());
        assert!(engine.applied.lock().unwrap().is_empty());

        // A mid-range level gets the same treatment in both directions
        assert!(controller.request_quality(0.5).unwrap());
        controller.await_transition().await;
        assert!(!controller.request_quality(0.5 + 0.005).unwrap());
        assert!(!controller.request_quality(0.5 - 0.005).unwrap());
        assert!(engine.applied.lock().unwrap().len() == 10);
    }

    #[tokio::test(start_paused = true)]
    async fn adjustment_bands() {
        let (controller, _engine) = controller();
        assert_eq!(controller.current_quality(), 1.0);

        // Medium band load with quality at high: candidate stays current
        assert!(!controller.trigger_adjustment(0.7).unwrap());

        // Overload drops to the low level
        assert!(controller.trigger_adjustment(0.95).unwrap());
        controller.await_transition().await;
        assert!((controller.current_quality() - 0.25).abs() < 1e-9);

        // Near idle climbs back to high
        assert!(controller.trigger_adjustment(0.1).unwrap());
        controller.await_transition().await;
        assert!((controller.current_quality() - 1.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn hysteresis_suppresses_small_moves() {
        let engine = Arc::new(RecordingEngine::default());
        let store = Arc::new(MemorySettings::new());
        let mut settings = QualitySettings::default();
        settings.levels.medium = 0.6;
        let controller = QualityController::new(settings, engine.clone(), store.clone());

        // Land exactly on the medium level first
        controller.request_quality(0.6).unwrap();
        controller.await_transition().await;
        engine.applied.lock().unwrap().clear();

        // High-band load recommends medium, which is where we already are
        assert!(!controller.trigger_adjustment(0.85).unwrap());
        assert!(engine.applied.lock().unwrap().is_empty());
    }
}
