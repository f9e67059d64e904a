//! Per-run collection state.

use crate::engine::dedup::Deduplicator;
use crate::engine::pacer::Pacer;
use crate::engine::stall::StallDetector;
use crate::extract::record::IdentityKey;
use crate::types::config::CollectConfig;
use crate::types::record::Record;

/// Everything a run accumulates, owned by the engine while it runs.
///
/// A state is created per run or handed back in to resume, in which case
/// the dedup set carries over and earlier records are never re-admitted.
/// `records().len()` always equals the number of identities seen.
#[derive(Debug, Clone)]
pub struct CollectionState {
    records: Vec<Record>,
    dedup: Deduplicator,
    pub(crate) pacer: Pacer,
    pub(crate) stall: StallDetector,
    pub(crate) steps: usize,
    pub(crate) refreshes: usize,
    pub(crate) skipped: usize,
}

impl CollectionState {
    pub fn new(identity: IdentityKey, config: &CollectConfig) -> Self {
        Self {
            records: Vec::new(),
            dedup: Deduplicator::new(identity),
            pacer: Pacer::new(&config.pace),
            stall: StallDetector::new(&config.stall),
            steps: 0,
            refreshes: 0,
            skipped: 0,
        }
    }

    /// Append the record if its identity is new.
    pub(crate) fn admit(&mut self, record: Record) -> bool {
        if self.dedup.admit(&record) {
            self.records.push(record);
            true
        } else {
            false
        }
    }

    /// Start a new run over a fresh view of the feed.
    ///
    /// Stall tracking belongs to a single view; records, dedup and pace
    /// carry over.
    pub(crate) fn begin_run(&mut self, config: &CollectConfig) {
        self.stall = StallDetector::new(&config.stall);
    }

    /// Accepted records in acceptance order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn accepted(&self) -> usize {
        self.records.len()
    }

    pub fn dedup(&self) -> &Deduplicator {
        &self.dedup
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn stall(&self) -> &StallDetector {
        &self.stall
    }

    /// Navigation steps across every run on this state.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
