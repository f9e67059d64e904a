//! Typed errors for the harvest library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! a blocked feed from a lost session without string matching.

use thiserror::Error;

/// Errors raised while reading a single field out of an item.
///
/// These never escape the field extractor: every variant is a signal to try
/// the next strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// The element (or attribute) the strategy looks for is not rendered
    #[error("element not present: {selector}")]
    StructuralAbsence { selector: String },

    /// A value exists but does not have the expected shape
    #[error("cannot read {value:?} as {expected}")]
    ParseFailure {
        value: String,
        expected: &'static str,
    },

    /// The selector itself could not be compiled
    #[error("invalid selector: {selector}")]
    InvalidSelector { selector: String },
}

impl ExtractError {
    /// Shorthand for a missing element.
    pub fn absent(selector: impl Into<String>) -> Self {
        Self::StructuralAbsence {
            selector: selector.into(),
        }
    }

    /// Shorthand for a value with the wrong shape.
    pub fn parse(value: impl Into<String>, expected: &'static str) -> Self {
        Self::ParseFailure {
            value: value.into(),
            expected,
        }
    }
}

/// Errors raised by a feed source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The feed cannot advance any further (no next page, end of scroll).
    ///
    /// The source must still answer `current_items` after returning this.
    #[error("navigation blocked: {reason}")]
    NavigationBlocked { reason: String },

    /// The session with the feed is gone (connection or driver failure)
    #[error("source unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A URL built by the source could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl SourceError {
    /// Shorthand for a blocked navigation.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self::NavigationBlocked {
            reason: reason.into(),
        }
    }

    /// Wrap a free-form message as a lost session.
    pub fn unavailable(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Unavailable(message.into())
    }

    /// Whether the run has to stop because the session is lost.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NavigationBlocked { .. })
    }
}

/// Errors raised while setting up a harvest (profiles, schemas, sources).
///
/// A running collection never returns these; see `CollectionReport`.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Building or opening the source failed
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Configuration is inconsistent
    #[error("config error: {0}")]
    Config(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a profile or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for field extraction strategies.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Result type alias for feed source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for setup operations.
pub type HarvestResult<T> = std::result::Result<T, HarvestError>;
