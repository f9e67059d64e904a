//! Domain types for feed harvesting.

pub mod config;
pub mod record;
pub mod window;

pub use config::{CollectConfig, PaceConfig, StallConfig, DEFAULT_MAX_STEPS};
pub use record::{FieldValue, Record, ResolvedTimestamp, TimestampSource};
pub use window::{budget_per_window, DateWindow};
