//! Date-windowed harvesting: one run per window over shared state.

use anyhow::Result;
use feed_harvest::{
    budget_per_window, CollectConfig, CollectionEngine, CollectionState, DateWindow,
    FeedSource, Record, RecordSchema, StopReason,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of harvesting every window.
#[derive(Debug)]
pub struct WindowedHarvest {
    pub records: Vec<Record>,

    /// The first abnormal stop if any window had one, else the last stop.
    pub stop: StopReason,

    /// Stop reason of each window that ran, in window order.
    pub window_stops: Vec<StopReason>,
}

/// Run each window in order, carrying dedup state across windows.
///
/// `source_for` builds a fresh source for a window. A target is split
/// across windows with [`budget_per_window`]; windows whose share is zero
/// are skipped. Cancellation ends the loop early.
pub async fn harvest_windows<S, F>(
    windows: &[DateWindow],
    schema: &RecordSchema,
    config: &CollectConfig,
    target: Option<usize>,
    max_steps: Option<usize>,
    cancel: &CancellationToken,
    mut source_for: F,
) -> Result<WindowedHarvest>
where
    S: FeedSource,
    F: FnMut(&DateWindow) -> Result<S>,
{
    let budgets = target.map(|t| budget_per_window(t, windows.len()));
    let mut state: Option<CollectionState> = None;
    let mut window_stops = Vec::new();
    let mut first_abnormal: Option<StopReason> = None;

    for (index, window) in windows.iter().enumerate() {
        let budget = budgets.as_ref().map(|b| b[index]);
        if budget == Some(0) {
            continue;
        }

        info!(
            window = index + 1,
            windows = windows.len(),
            start = %window.start,
            end = %window.end,
            "Harvesting date window"
        );

        let source = source_for(window)?;
        let mut engine = CollectionEngine::new(source, schema.clone())?
            .with_config(config.clone())
            .with_cancellation(cancel.clone());

        let current = state.take().unwrap_or_else(|| engine.new_state());
        let report = engine.resume(current, budget, max_steps).await;

        info!(
            window = index + 1,
            accepted = report.accepted(),
            stop = %report.stop,
            "Window finished"
        );

        if !report.stop.is_normal() && first_abnormal.is_none() {
            warn!(window = index + 1, stop = %report.stop, "Window ended early");
            first_abnormal = Some(report.stop.clone());
        }
        let cancelled = report.stop == StopReason::Cancelled;
        window_stops.push(report.stop.clone());
        state = Some(report.into_state());

        if cancelled {
            break;
        }
    }

    let stop = first_abnormal
        .or_else(|| window_stops.last().cloned())
        .unwrap_or(match target {
            Some(_) => StopReason::TargetReached,
            None => StopReason::EndOfFeed,
        });
    let records = state.map(CollectionState::into_records).unwrap_or_default();

    Ok(WindowedHarvest {
        records,
        stop,
        window_stops,
    })
}
