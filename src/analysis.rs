//! Performance analysis over the retained snapshot window
//!
//! **Purpose:** Turn a window of metric snapshots into average/peak load, a
//! stability score, a letter grade, and per-cycle recommendation and
//! bottleneck lists.
//!
//! The recommendation and bottleneck lists are fully replaced each cycle;
//! nothing accumulates across analyses.

use crate::metrics::MetricSnapshot;
use serde::{Deserialize, Serialize};

/// Number of most-recent samples the load average weights
const AVERAGE_WINDOW: usize = 10;

/// Performance letter grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Classify average load and stability into a grade.
    ///
    /// First match wins, evaluated top down. Stability bounds are strict, so
    /// `avg=0.5, stability=0.6` lands in C rather than B.
    pub fn classify(average_load: f64, stability: f64) -> Self {
        if average_load < 0.3 && stability > 0.8 {
            Grade::A
        } else if average_load < 0.5 && stability > 0.6 {
            Grade::B
        } else if average_load < 0.7 && stability > 0.4 {
            Grade::C
        } else if average_load < 0.9 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
            Grade::D => write!(f, "D"),
            Grade::F => write!(f, "F"),
        }
    }
}

/// Severity attached to recommendations and bottlenecks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Actions the analyzer can recommend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ReduceQuality,
    LimitConcurrentAudio,
    EnableAdaptiveQuality,
    CleanupMemory,
}

/// One recommendation, re-derived every cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: RecommendedAction,
    pub severity: Severity,
    pub message: String,
}

/// Metric dimension a bottleneck was detected on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckKind {
    Cpu,
    Memory,
    Latency,
    Buffer,
}

/// Detected bottleneck with the offending value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    pub severity: Severity,
    pub value: f64,
    pub description: String,
}

/// Full analyzer output, recomputed each cycle
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Mean combined load over the most recent samples
    pub average_load: f64,

    /// Maximum combined load over the entire retained window
    pub peak_load: f64,

    /// Inverse of combined load variance, in [0, 1]
    pub stability_score: f64,

    pub grade: Grade,
    pub recommendations: Vec<Recommendation>,
    pub bottlenecks: Vec<Bottleneck>,
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            average_load: 0.0,
            peak_load: 0.0,
            stability_score: 1.0,
            grade: Grade::A,
            recommendations: Vec::new(),
            bottlenecks: Vec::new(),
        }
    }
}

/// Analyzer holding the most recent result
#[derive(Debug, Default)]
pub struct PerformanceAnalyzer {
    result: AnalysisResult,
}

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze the retained window.
    ///
    /// Needs at least two samples; below that, stability resets to 1.0 and
    /// the remaining fields keep their prior values.
    pub fn analyze(&mut self, window: &[MetricSnapshot]) -> &AnalysisResult {
        if window.len() < 2 {
            self.result.stability_score = 1.0;
            return &self.result;
        }

        let loads: Vec<f64> = window.iter().map(MetricSnapshot::combined_load).collect();

        let recent = &loads[loads.len().saturating_sub(AVERAGE_WINDOW)..];
        self.result.average_load = recent.iter().sum::<f64>() / recent.len() as f64;
        self.result.peak_load = loads.iter().copied().fold(0.0_f64, f64::max);

        let mean = loads.iter().sum::<f64>() / loads.len() as f64;
        let variance = loads
            .iter()
            .map(|load| {
                let diff = load - mean;
                diff * diff
            })
            .sum::<f64>()
            / loads.len() as f64;
        // Summation noise on constant input shows up as a tiny nonzero
        // deviation; below this it counts as no jitter at all.
        let stddev = variance.sqrt();
        let stddev = if stddev < 1e-9 { 0.0 } else { stddev };
        self.result.stability_score = (1.0 - 2.0 * stddev).max(0.0);

        self.result.grade = Grade::classify(self.result.average_load, self.result.stability_score);

        // Safe: window.len() >= 2
        let latest = &window[window.len() - 1];
        self.result.recommendations = self.recommendations(latest);
        self.result.bottlenecks = bottlenecks(latest);

        &self.result
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    pub fn reset(&mut self) {
        self.result = AnalysisResult::default();
    }

    /// Independent boolean rules; several may fire in the same cycle.
    fn recommendations(&self, latest: &MetricSnapshot) -> Vec<Recommendation> {
        let mut out = Vec::new();

        if self.result.average_load > 0.8 {
            out.push(Recommendation {
                action: RecommendedAction::ReduceQuality,
                severity: Severity::High,
                message: "Sustained load is high; lowering audio quality is recommended".into(),
            });
        }
        if latest.active_audio_nodes > 15 {
            out.push(Recommendation {
                action: RecommendedAction::LimitConcurrentAudio,
                severity: Severity::Medium,
                message: "Many active audio nodes; limiting concurrent playback is recommended"
                    .into(),
            });
        }
        if self.result.stability_score < 0.5 {
            out.push(Recommendation {
                action: RecommendedAction::EnableAdaptiveQuality,
                severity: Severity::Medium,
                message: "Load is unstable; enabling adaptive quality is recommended".into(),
            });
        }
        if latest.memory_usage > 0.8 {
            out.push(Recommendation {
                action: RecommendedAction::CleanupMemory,
                severity: Severity::High,
                message: "Memory usage is high; running a cleanup is recommended".into(),
            });
        }

        out
    }
}

/// Per-metric bottleneck detection, each dimension thresholded independently
fn bottlenecks(latest: &MetricSnapshot) -> Vec<Bottleneck> {
    let mut out = Vec::new();

    if latest.cpu_usage > 0.8 {
        out.push(Bottleneck {
            kind: BottleneckKind::Cpu,
            severity: if latest.cpu_usage > 0.9 {
                Severity::Critical
            } else {
                Severity::High
            },
            value: latest.cpu_usage,
            description: "CPU usage is too high".into(),
        });
    }
    if latest.memory_usage > 0.8 {
        out.push(Bottleneck {
            kind: BottleneckKind::Memory,
            severity: if latest.memory_usage > 0.9 {
                Severity::Critical
            } else {
                Severity::High
            },
            value: latest.memory_usage,
            description: "Memory usage is too high".into(),
        });
    }
    if latest.latency_ms > 50.0 {
        out.push(Bottleneck {
            kind: BottleneckKind::Latency,
            severity: if latest.latency_ms > 100.0 {
                Severity::Critical
            } else {
                Severity::Medium
            },
            value: latest.latency_ms,
            description: "Audio latency is too high".into(),
        });
    }
    if latest.buffer_underruns > 5 {
        out.push(Bottleneck {
            kind: BottleneckKind::Buffer,
            severity: Severity::High,
            value: latest.buffer_underruns as f64,
            description: "Buffer underruns are occurring".into(),
        });
    }

    out
}
