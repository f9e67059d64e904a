//! The incremental collection loop.
//!
//! One run is a single cooperative task:
//!
//! ```text
//! harvest visible items
//! loop {
//!     cancelled? budget spent? → stop
//!     navigate → harvest → observe yield (pacer, stall)
//!     target reached / end of feed / exhausted → stop
//!     refresh if stalled, then sleep (cancellable)
//! }
//! ```
//!
//! The loop never fails: source loss and cancellation end the run with a
//! [`StopReason`] and whatever was collected so far.

use std::fmt;

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::engine::stall::StallDecision;
use crate::engine::state::CollectionState;
use crate::error::{HarvestResult, SourceError};
use crate::extract::record::{RecordBuilder, RecordSchema};
use crate::traits::source::FeedSource;
use crate::types::config::CollectConfig;
use crate::types::record::Record;

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// The requested number of records was collected
    TargetReached,

    /// Stalled again after a refresh with nothing new in between
    Exhausted,

    /// The source could not navigate any further
    EndOfFeed,

    /// The navigation step budget ran out
    StepBudget,

    /// The cancellation token fired
    Cancelled,

    /// The source session was lost; records collected so far are kept
    SourceUnavailable { message: String },
}

impl StopReason {
    /// Whether the run ended on its own terms rather than by loss or
    /// cancellation.
    pub fn is_normal(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::SourceUnavailable { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetReached => "target_reached",
            Self::Exhausted => "exhausted",
            Self::EndOfFeed => "end_of_feed",
            Self::StepBudget => "step_budget",
            Self::Cancelled => "cancelled",
            Self::SourceUnavailable { .. } => "source_unavailable",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable { message } => write!(f, "source_unavailable ({message})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub run_id: Uuid,

    /// Records accepted during this run, in acceptance order
    pub records: Vec<Record>,

    pub stop: StopReason,

    /// Navigation steps taken during this run
    pub steps: usize,

    pub refreshes: usize,

    /// Items dropped for a missing required field or identity
    pub skipped: usize,

    /// State to hand to [`CollectionEngine::resume`]
    pub state: CollectionState,
}

impl CollectionReport {
    pub fn accepted(&self) -> usize {
        self.records.len()
    }

    pub fn into_state(self) -> CollectionState {
        self.state
    }
}

/// Drives one feed source through collection runs.
pub struct CollectionEngine<S: FeedSource> {
    source: S,
    builder: RecordBuilder,
    config: CollectConfig,
    cancel: CancellationToken,
}

impl<S: FeedSource> CollectionEngine<S> {
    /// Create an engine; fails if the schema is invalid.
    pub fn new(source: S, schema: RecordSchema) -> HarvestResult<Self> {
        Ok(Self {
            source,
            builder: RecordBuilder::new(schema)?,
            config: CollectConfig::default(),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_config(mut self, config: CollectConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &CollectConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Empty state for this engine's schema and config.
    pub fn new_state(&self) -> CollectionState {
        CollectionState::new(self.builder.identity().clone(), &self.config)
    }

    /// Run a fresh collection.
    ///
    /// `max_steps = None` falls back to the configured budget.
    pub async fn collect(
        &mut self,
        target: Option<usize>,
        max_steps: Option<usize>,
    ) -> CollectionReport {
        let state = self.new_state();
        self.resume(state, target, max_steps).await
    }

    /// Continue collecting into an earlier run's state.
    ///
    /// Records already in the state count as seen; `target` applies to
    /// records accepted by this run only.
    pub async fn resume(
        &mut self,
        mut state: CollectionState,
        target: Option<usize>,
        max_steps: Option<usize>,
    ) -> CollectionReport {
        let run_id = Uuid::new_v4();
        let max_steps = max_steps.unwrap_or(self.config.max_steps);

        let start_records = state.accepted();
        let start_steps = state.steps;
        let start_refreshes = state.refreshes;
        let start_skipped = state.skipped;

        state.begin_run(&self.config);
        let stop = self.run(&mut state, run_id, target, max_steps).await;

        let report = CollectionReport {
            run_id,
            records: state.records()[start_records..].to_vec(),
            stop,
            steps: state.steps - start_steps,
            refreshes: state.refreshes - start_refreshes,
            skipped: state.skipped - start_skipped,
            state,
        };

        info!(
            run_id = %run_id,
            source = %self.source.name(),
            stop = %report.stop,
            accepted = report.accepted(),
            steps = report.steps,
            refreshes = report.refreshes,
            skipped = report.skipped,
            "Collection run finished"
        );

        report
    }

    #[instrument(skip(self, state), fields(source = %self.source.name()))]
    async fn run(
        &mut self,
        state: &mut CollectionState,
        run_id: Uuid,
        target: Option<usize>,
        max_steps: usize,
    ) -> StopReason {
        let start = state.accepted();
        let collected = |state: &CollectionState| state.accepted() - start;
        let reached = |state: &CollectionState| target.is_some_and(|t| collected(state) >= t);
        let remaining = |state: &CollectionState| target.map(|t| t.saturating_sub(collected(state)));

        if reached(state) {
            return StopReason::TargetReached;
        }

        info!(target_records = ?target, max_steps, "Starting collection run");

        // Whatever is already rendered counts, but is not a step.
        let budget = remaining(state);
        if let Err(err) = self.harvest(state, budget).await {
            return unavailable(err);
        }

        let mut steps = 0;
        loop {
            if reached(state) {
                return StopReason::TargetReached;
            }
            if self.cancel.is_cancelled() {
                info!("Collection cancelled");
                return StopReason::Cancelled;
            }
            if steps >= max_steps {
                info!(steps, "Step budget exhausted");
                return StopReason::StepBudget;
            }

            let blocked = match self.source.navigate().await {
                Ok(()) => None,
                Err(SourceError::NavigationBlocked { reason }) => Some(reason),
                Err(err) => return unavailable(err),
            };
            steps += 1;
            state.steps += 1;

            let budget = remaining(state);
            let step_yield = match self.harvest(state, budget).await {
                Ok(accepted) => accepted,
                Err(err) => return unavailable(err),
            };

            debug!(
                step = steps,
                step_yield,
                total = collected(state),
                interval_ms = state.pacer.current_interval().as_millis() as u64,
                "Step harvested"
            );

            if reached(state) {
                return StopReason::TargetReached;
            }
            if let Some(reason) = blocked {
                info!(reason = %reason, steps, "End of feed");
                return StopReason::EndOfFeed;
            }

            state.pacer.observe(step_yield);
            match state.stall.observe(step_yield, state.accepted()) {
                StallDecision::Continue => {}
                StallDecision::Stop => {
                    info!(steps, "Feed exhausted after refresh");
                    return StopReason::Exhausted;
                }
                StallDecision::Refresh => {
                    state.refreshes += 1;
                    info!(steps, refreshes = state.refreshes, "Feed stalled, refreshing");
                    if let Err(err) = self.source.hard_reset().await {
                        if err.is_fatal() {
                            return unavailable(err);
                        }
                        debug!(error = %err, "Reset did not move the feed");
                    }
                    let budget = remaining(state);
                    if let Err(err) = self.harvest(state, budget).await {
                        return unavailable(err);
                    }
                    if reached(state) {
                        return StopReason::TargetReached;
                    }
                }
            }

            let delay = state.pacer.next_delay();
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Collection cancelled during pacing delay");
                    return StopReason::Cancelled;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Build and admit every visible item; returns the number accepted.
    ///
    /// Items are consumed before the next await on the source.
    async fn harvest(
        &mut self,
        state: &mut CollectionState,
        remaining: Option<usize>,
    ) -> Result<usize, SourceError> {
        let items = match self.source.current_items().await {
            Ok(items) => items,
            Err(err) if !err.is_fatal() => {
                debug!(error = %err, "No items in current view");
                return Ok(0);
            }
            Err(err) => return Err(err),
        };

        let collected_at = Utc::now();
        let mut accepted = 0;
        for item in &items {
            if remaining.is_some_and(|r| accepted >= r) {
                break;
            }
            match self.builder.build(item, collected_at) {
                Some(record) => {
                    if state.admit(record) {
                        accepted += 1;
                    }
                }
                None => state.skipped += 1,
            }
        }

        Ok(accepted)
    }
}

fn unavailable(err: SourceError) -> StopReason {
    warn!(error = %err, "Source unavailable, keeping collected records");
    StopReason::SourceUnavailable {
        message: err.to_string(),
    }
}
