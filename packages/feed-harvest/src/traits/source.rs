//! FeedSource trait for dynamically loading feeds.
//!
//! A feed source owns one navigable view of a feed (a browser tab, an HTTP
//! session walking result pages, a scripted fixture) and exposes the items
//! currently materialized in it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use feed_harvest::traits::source::FeedSource;
//!
//! let items = source.current_items().await?;
//! source.navigate().await?;          // scroll to end or click "next"
//! let more = source.current_items().await?;
//! ```

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::traits::item::ItemView;

/// A navigable, dynamically loading feed.
///
/// Implementations:
/// - `HttpPagedSource` - server-rendered result pages over HTTP
/// - `ScriptedFeed` - canned frames for tests
///
/// Browser-driven sources (infinite scroll) implement the same trait outside
/// this crate.
///
/// # Item lifetime
///
/// Items returned by `current_items` are only meaningful until the next
/// `navigate` or `hard_reset`. The collection engine consumes every item of
/// a step before it navigates again.
#[async_trait]
pub trait FeedSource: Send {
    /// Snapshot of one rendered item.
    type Item: ItemView + Send;

    /// Advance the feed (scroll to the end or follow "next").
    ///
    /// # Errors
    ///
    /// - `NavigationBlocked` when no further movement is possible. The view
    ///   stays queryable afterwards.
    /// - `Unavailable` when the session is lost.
    async fn navigate(&mut self) -> SourceResult<()>;

    /// Items currently materialized, in a stable order for this view.
    async fn current_items(&mut self) -> SourceResult<Vec<Self::Item>>;

    /// Reload the feed from its initial state, dropping navigation progress.
    async fn hard_reset(&mut self) -> SourceResult<()>;

    /// Get the source name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}
