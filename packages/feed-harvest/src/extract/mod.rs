//! Turning rendered items into structured records.
//!
//! - [`field`] - field specs, strategies and transforms
//! - [`extractor`] - ordered strategy fallback per field
//! - [`timestamp`] - displayed → machine → collection-time resolution
//! - [`numeric`] - magnitude-suffixed counts and scores
//! - [`record`] - schemas, identity keys and the record builder

pub mod extractor;
pub mod field;
pub mod numeric;
pub mod record;
pub mod timestamp;

pub use extractor::{ExtractionOutcome, FieldExtractor};
pub use field::{ClassifyRule, CombineOp, FieldKind, FieldSpec, Probe, Strategy, Transform};
pub use numeric::{parse_count, try_parse_count, try_parse_score};
pub use record::{IdentityKey, KeyNormalization, RecordBuilder, RecordSchema};
pub use timestamp::TimestampResolver;
