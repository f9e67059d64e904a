//! Query primitive over one rendered feed item.

use crate::error::{ExtractError, ExtractResult};

/// Read access to a single item handle.
///
/// Selectors are interpreted by the implementation (CSS for HTML items).
/// The empty selector addresses the item's own root element. A missing
/// element or attribute is reported as [`ExtractError::StructuralAbsence`];
/// implementations must never panic on malformed markup.
pub trait ItemView {
    /// Visible text of the first element matching `selector`.
    fn text(&self, selector: &str) -> ExtractResult<String>;

    /// Attribute `name` of the first element matching `selector`.
    fn attr(&self, selector: &str, name: &str) -> ExtractResult<String>;

    /// Visible text of every element matching `selector`, in document order.
    ///
    /// An empty vector means nothing matched; it is not an error.
    fn texts(&self, selector: &str) -> ExtractResult<Vec<String>>;

    /// Text of the `index`-th element matching `selector`.
    fn nth_text(&self, selector: &str, index: usize) -> ExtractResult<String> {
        self.texts(selector)?
            .into_iter()
            .nth(index)
            .ok_or_else(|| ExtractError::absent(format!("{selector}[{index}]")))
    }
}

impl<T: ItemView + ?Sized> ItemView for &T {
    fn text(&self, selector: &str) -> ExtractResult<String> {
        (**self).text(selector)
    }

    fn attr(&self, selector: &str, name: &str) -> ExtractResult<String> {
        (**self).attr(selector, name)
    }

    fn texts(&self, selector: &str) -> ExtractResult<Vec<String>> {
        (**self).texts(selector)
    }

    fn nth_text(&self, selector: &str, index: usize) -> ExtractResult<String> {
        (**self).nth_text(selector, index)
    }
}
