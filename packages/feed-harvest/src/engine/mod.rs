//! The collection engine and the components it drives.

pub mod collector;
pub mod dedup;
pub mod pacer;
pub mod stall;
pub mod state;

pub use collector::{CollectionEngine, CollectionReport, StopReason};
pub use dedup::Deduplicator;
pub use pacer::Pacer;
pub use stall::{StallDecision, StallDetector, StallPhase};
pub use state::CollectionState;
