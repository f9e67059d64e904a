//! Adaptive pacing between navigation steps.
//!
//! Productive steps speed the loop up, thin or empty steps slow it down.
//! The interval never leaves `[min, max]`.

use std::time::Duration;

use crate::types::config::PaceConfig;

/// Tracks the delay before the next navigation.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    min: Duration,
    max: Duration,
    step: Duration,
    low_yield: usize,
    high_yield: usize,
    jitter: f64,
}

impl Pacer {
    pub fn new(config: &PaceConfig) -> Self {
        let (min, max) = config.bounds();
        let jitter = if config.jitter.is_finite() {
            config.jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            interval: Duration::from_millis(config.initial_ms).clamp(min, max),
            min,
            max,
            step: Duration::from_millis(config.step_ms),
            low_yield: config.low_yield,
            high_yield: config.high_yield,
            jitter,
        }
    }

    /// Adjust the interval for the number of records a step accepted.
    pub fn observe(&mut self, step_yield: usize) {
        if step_yield > self.high_yield {
            self.interval = self.interval.saturating_sub(self.step).max(self.min);
        } else if step_yield == 0 || step_yield < self.low_yield {
            self.interval = self.interval.saturating_add(self.step).min(self.max);
        }
    }

    pub fn current_interval(&self) -> Duration {
        self.interval
    }

    /// The interval spread by the configured jitter, still within bounds.
    pub fn next_delay(&self) -> Duration {
        if self.jitter == 0.0 {
            return self.interval;
        }
        let spread = self.jitter * (fastrand::f64() * 2.0 - 1.0);
        self.interval.mul_f64(1.0 + spread).clamp(self.min, self.max)
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }
}
