//! Stall detection and the termination policy built on it.

use crate::types::config::StallConfig;

/// Where the detector is in its stall cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallPhase {
    /// The last step accepted something
    Running,

    /// `n` consecutive steps accepted nothing
    Stalling(u32),

    /// The threshold was hit with new records since the last breach
    Refreshing,

    /// The threshold was hit twice with nothing new in between
    Exhausted,
}

/// What the engine should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallDecision {
    Continue,
    Refresh,
    Stop,
}

/// Counts consecutive empty steps and decides between refreshing the feed
/// and giving up.
///
/// When the streak reaches the threshold the accepted total is compared with
/// the total at the previous breach. An unchanged total means a refresh
/// already failed to surface anything new, so the feed is exhausted. The
/// first breach of a run always refreshes.
#[derive(Debug, Clone)]
pub struct StallDetector {
    threshold: u32,
    streak: u32,
    baseline: Option<usize>,
    phase: StallPhase,
}

impl StallDetector {
    pub fn new(config: &StallConfig) -> Self {
        Self {
            threshold: config.threshold.max(1),
            streak: 0,
            baseline: None,
            phase: StallPhase::Running,
        }
    }

    /// Feed one step's yield and the accepted total after it.
    pub fn observe(&mut self, step_yield: usize, accepted_total: usize) -> StallDecision {
        if step_yield > 0 {
            self.streak = 0;
            self.phase = StallPhase::Running;
            return StallDecision::Continue;
        }

        self.streak += 1;
        if self.streak < self.threshold {
            self.phase = StallPhase::Stalling(self.streak);
            return StallDecision::Continue;
        }

        if self.baseline == Some(accepted_total) {
            self.phase = StallPhase::Exhausted;
            return StallDecision::Stop;
        }

        self.baseline = Some(accepted_total);
        self.streak = 0;
        self.phase = StallPhase::Refreshing;
        StallDecision::Refresh
    }

    pub fn phase(&self) -> StallPhase {
        self.phase
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
