//! Incremental Feed Harvesting Library
//!
//! Collects structured records from dynamically loading feeds (infinite
//! scroll, "next page" result lists) whose markup is volatile and often
//! partially missing.
//!
//! # Design
//!
//! - One cooperative loop per run: navigate, harvest, deduplicate, pace
//! - Fields are read through ordered fallback strategies, never hard errors
//! - Timestamps resolve through displayed text, machine attribute, then
//!   collection time
//! - Runs end with a reason and the records collected so far
//!
//! # Usage
//!
//! ```rust,ignore
//! use feed_harvest::{CollectionEngine, FieldSpec, IdentityKey, KeyNormalization, RecordSchema, Strategy};
//! use feed_harvest::sources::{HttpPagedSource, HttpSourceConfig, Pagination};
//!
//! let schema = RecordSchema::new(IdentityKey::new("link", KeyNormalization::Url))
//!     .with_field(FieldSpec::text("title").with_strategy(Strategy::text("h3")).required())
//!     .with_field(FieldSpec::url("link").with_strategy(Strategy::attr("a", "href")));
//!
//! let source = HttpPagedSource::new(HttpSourceConfig::new(
//!     "https://news.example.com/search?q=rust",
//!     "article",
//!     Pagination::PageParam { name: "page".into(), start: 1 },
//! ))?;
//!
//! let mut engine = CollectionEngine::new(source, schema)?;
//! let report = engine.collect(Some(100), None).await;
//! println!("{} records ({})", report.accepted(), report.stop);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - FeedSource and ItemView abstractions
//! - [`types`] - Records, configs, date windows
//! - [`extract`] - Field strategies, record building, timestamps
//! - [`engine`] - Collection loop, dedup, pacing, stall detection
//! - [`sources`] - HTTP paged source and HTML items
//! - [`testing`] - Scripted feeds and mock items

pub mod engine;
pub mod error;
pub mod extract;
pub mod sources;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use engine::{
    CollectionEngine, CollectionReport, CollectionState, Deduplicator, Pacer, StallDecision,
    StallDetector, StallPhase, StopReason,
};
pub use error::{ExtractError, HarvestError, HarvestResult, SourceError, SourceResult};
pub use extract::{
    parse_count, ClassifyRule, CombineOp, ExtractionOutcome, FieldExtractor, FieldKind,
    FieldSpec, IdentityKey, KeyNormalization, Probe, RecordBuilder, RecordSchema, Strategy,
    TimestampResolver, Transform,
};
pub use traits::{FeedSource, ItemView};
pub use types::{
    budget_per_window, CollectConfig, DateWindow, FieldValue, PaceConfig, Record,
    ResolvedTimestamp, StallConfig, TimestampSource,
};
