//! Test doubles for feed sources and items.
//!
//! `ScriptedFeed` plays back canned frames and records every call so tests
//! can assert on navigation, refresh and query counts.
//!
//! # Example
//!
//! ```rust
//! use feed_harvest::testing::{MockItem, ScriptedFeed};
//!
//! let feed = ScriptedFeed::new()
//!     .with_frame(vec![MockItem::new().with_text(".id", "1")])
//!     .with_frame(vec![MockItem::new().with_text(".id", "2")]);
//! assert_eq!(feed.navigate_call_count(), 0);
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{ExtractError, ExtractResult, SourceError, SourceResult};
use crate::traits::item::ItemView;
use crate::traits::source::FeedSource;

/// An in-memory item keyed by selector.
///
/// The empty selector is the item root, like any other key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockItem {
    texts: HashMap<String, Vec<String>>,
    attrs: HashMap<(String, String), String>,
}

impl MockItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the single text matched by `selector`.
    pub fn with_text(mut self, selector: &str, text: &str) -> Self {
        self.texts
            .insert(selector.to_string(), vec![text.to_string()]);
        self
    }

    /// Set every text matched by `selector`, in order.
    pub fn with_texts(mut self, selector: &str, texts: &[&str]) -> Self {
        self.texts.insert(
            selector.to_string(),
            texts.iter().map(|t| t.to_string()).collect(),
        );
        self
    }

    pub fn with_attr(mut self, selector: &str, name: &str, value: &str) -> Self {
        self.attrs
            .insert((selector.to_string(), name.to_string()), value.to_string());
        self
    }
}

impl ItemView for MockItem {
    fn text(&self, selector: &str) -> ExtractResult<String> {
        self.texts
            .get(selector)
            .and_then(|texts| texts.first())
            .cloned()
            .ok_or_else(|| ExtractError::absent(selector))
    }

    fn attr(&self, selector: &str, name: &str) -> ExtractResult<String> {
        self.attrs
            .get(&(selector.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ExtractError::absent(format!("{selector}@{name}")))
    }

    fn texts(&self, selector: &str) -> ExtractResult<Vec<String>> {
        Ok(self.texts.get(selector).cloned().unwrap_or_default())
    }
}

/// What `navigate` does once the last frame is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtEnd {
    /// Stay on the last frame (a feed that silently stops loading)
    #[default]
    Hold,

    /// Report `NavigationBlocked`
    Block,
}

#[derive(Debug, Default)]
struct Script {
    frames: Vec<Vec<MockItem>>,
    position: usize,
    at_end: AtEnd,
    fail_on_navigate: Option<usize>,
    navigate_calls: usize,
    items_calls: usize,
    reset_calls: usize,
}

/// A feed that plays back canned frames.
///
/// Frame 0 is visible before the first navigation; each successful
/// `navigate` shows the next frame and `hard_reset` returns to frame 0.
/// Clones share the script, so a test can keep a handle for assertions
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFeed {
    script: Arc<RwLock<Script>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame.
    pub fn with_frame(self, items: Vec<MockItem>) -> Self {
        self.script.write().unwrap().frames.push(items);
        self
    }

    pub fn with_frames(self, frames: Vec<Vec<MockItem>>) -> Self {
        self.script.write().unwrap().frames.extend(frames);
        self
    }

    /// Report `NavigationBlocked` after the last frame instead of holding.
    pub fn blocking_at_end(self) -> Self {
        self.script.write().unwrap().at_end = AtEnd::Block;
        self
    }

    /// Fail with `Unavailable` on the `n`-th navigate call (1-based).
    pub fn failing_on_navigate(self, n: usize) -> Self {
        self.script.write().unwrap().fail_on_navigate = Some(n);
        self
    }

    pub fn navigate_call_count(&self) -> usize {
        self.script.read().unwrap().navigate_calls
    }

    pub fn items_call_count(&self) -> usize {
        self.script.read().unwrap().items_calls
    }

    pub fn reset_call_count(&self) -> usize {
        self.script.read().unwrap().reset_calls
    }

    /// Index of the frame currently showing.
    pub fn position(&self) -> usize {
        self.script.read().unwrap().position
    }
}

#[async_trait]
impl FeedSource for ScriptedFeed {
    type Item = MockItem;

    async fn navigate(&mut self) -> SourceResult<()> {
        let mut script = self.script.write().unwrap();
        script.navigate_calls += 1;

        if script.fail_on_navigate == Some(script.navigate_calls) {
            return Err(SourceError::unavailable("scripted session loss"));
        }

        if script.position + 1 < script.frames.len() {
            script.position += 1;
            return Ok(());
        }

        match script.at_end {
            AtEnd::Hold => Ok(()),
            AtEnd::Block => Err(SourceError::blocked("no more frames")),
        }
    }

    async fn current_items(&mut self) -> SourceResult<Vec<MockItem>> {
        let mut script = self.script.write().unwrap();
        script.items_calls += 1;
        Ok(script
            .frames
            .get(script.position)
            .cloned()
            .unwrap_or_default())
    }

    async fn hard_reset(&mut self) -> SourceResult<()> {
        let mut script = self.script.write().unwrap();
        script.reset_calls += 1;
        script.position = 0;
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
