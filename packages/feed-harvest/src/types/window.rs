//! Date windows for time-sliced collection.
//!
//! Search feeds that only return a bounded number of results per query are
//! harvested window by window, with the record budget spread across windows.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Split `[start, end]` into consecutive windows of `period_days` days.
    ///
    /// Each window starts the day after the previous one ends; the last
    /// window is cut short at `end`. Returns nothing when `start > end`.
    pub fn split(start: NaiveDate, end: NaiveDate, period_days: u32) -> Vec<Self> {
        let span = Duration::days(i64::from(period_days.max(1)) - 1);
        let mut windows = Vec::new();
        let mut current = start;

        while current <= end {
            let window_end = current.checked_add_signed(span).unwrap_or(end).min(end);
            windows.push(Self::new(current, window_end));
            match window_end.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }

        windows
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Replace `{start}` and `{end}` in a URL template with ISO dates.
    pub fn fill(&self, template: &str) -> String {
        template
            .replace("{start}", &self.start.format("%Y-%m-%d").to_string())
            .replace("{end}", &self.end.format("%Y-%m-%d").to_string())
    }
}

/// Spread a record budget across `windows` runs.
///
/// The remainder goes to the earliest windows, so the shares always sum to
/// `total`.
pub fn budget_per_window(total: usize, windows: usize) -> Vec<usize> {
    if windows == 0 {
        return Vec::new();
    }
    let base = total / windows;
    let extra = total % windows;
    (0..windows)
        .map(|i| if i < extra { base + 1 } else { base })
        .collect()
}
