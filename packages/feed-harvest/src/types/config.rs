//! Configuration types for collection runs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Step budget used when a run is started without an explicit one.
pub const DEFAULT_MAX_STEPS: usize = 200;

/// Configuration for one collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Hard upper bound on navigation steps.
    ///
    /// Applies when `collect` is called without a step budget. The loop
    /// stops after this many navigations even if the feed never ends.
    pub max_steps: usize,

    /// Adaptive pacing between navigation steps.
    pub pace: PaceConfig,

    /// Stall detection and refresh policy.
    pub stall: StallConfig,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            pace: PaceConfig::default(),
            stall: StallConfig::default(),
        }
    }
}

impl CollectConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default step budget.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set pacing.
    pub fn with_pace(mut self, pace: PaceConfig) -> Self {
        self.pace = pace;
        self
    }

    /// Set the number of consecutive empty steps that counts as a stall.
    pub fn with_stall_threshold(mut self, threshold: u32) -> Self {
        self.stall.threshold = threshold;
        self
    }
}

/// Pacing bounds and adaptation rule.
///
/// Durations are in milliseconds so profiles stay plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceConfig {
    /// Interval used before any step has been observed.
    pub initial_ms: u64,

    /// Fastest allowed pace.
    pub min_ms: u64,

    /// Slowest allowed pace.
    pub max_ms: u64,

    /// Amount the interval moves per adjustment.
    pub step_ms: u64,

    /// Yields above this speed the pace up.
    pub high_yield: usize,

    /// Yields below this (including zero) slow the pace down.
    pub low_yield: usize,

    /// Random spread applied to each sleep, as a fraction of the interval.
    ///
    /// 0.0 disables jitter. The jittered sleep is still clamped to
    /// `[min_ms, max_ms]`.
    pub jitter: f64,
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            min_ms: 200,
            max_ms: 1_000,
            step_ms: 100,
            high_yield: 5,
            low_yield: 3,
            jitter: 0.0,
        }
    }
}

impl PaceConfig {
    /// Create a pacing config with explicit bounds.
    pub fn new(initial: Duration, min: Duration, max: Duration) -> Self {
        Self {
            initial_ms: initial.as_millis() as u64,
            min_ms: min.as_millis() as u64,
            max_ms: max.as_millis() as u64,
            ..Default::default()
        }
    }

    /// Set the adjustment step.
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step_ms = step.as_millis() as u64;
        self
    }

    /// Set the yield thresholds.
    pub fn with_thresholds(mut self, low_yield: usize, high_yield: usize) -> Self {
        self.low_yield = low_yield;
        self.high_yield = high_yield;
        self
    }

    /// Set the jitter fraction (clamped to `[0, 1]`).
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Lower and upper bound, swapped if configured backwards.
    pub fn bounds(&self) -> (Duration, Duration) {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        (Duration::from_millis(lo), Duration::from_millis(hi))
    }
}

/// Stall detection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StallConfig {
    /// Consecutive empty steps before the feed is refreshed or abandoned.
    pub threshold: u32,
}

impl Default for StallConfig {
    fn default() -> Self {
        Self { threshold: 3 }
    }
}
