//! HTML item snapshots queried with CSS selectors.

use scraper::{ElementRef, Html, Selector};

use crate::error::{ExtractError, ExtractResult};
use crate::traits::item::ItemView;

/// An owned snapshot of one rendered item.
///
/// Stores the item's outer HTML and parses it on each query, so the
/// snapshot is `Send` and outlives the page it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlItem {
    html: String,
}

impl HtmlItem {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Snapshot an element of a parsed page.
    pub fn from_element(element: ElementRef<'_>) -> Self {
        Self::new(element.html())
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    fn with_matches<T>(
        &self,
        selector: &str,
        f: impl FnOnce(&mut dyn Iterator<Item = ElementRef<'_>>) -> T,
    ) -> ExtractResult<T> {
        let fragment = Html::parse_fragment(&self.html);
        if selector.trim().is_empty() {
            let mut root = fragment.root_element().children().filter_map(ElementRef::wrap);
            return Ok(f(&mut root));
        }
        let selector = parse_selector(selector)?;
        let mut matches = fragment.select(&selector);
        Ok(f(&mut matches))
    }
}

impl ItemView for HtmlItem {
    fn text(&self, selector: &str) -> ExtractResult<String> {
        self.with_matches(selector, |matches| matches.next().map(element_text))?
            .ok_or_else(|| ExtractError::absent(selector))
    }

    fn attr(&self, selector: &str, name: &str) -> ExtractResult<String> {
        self.with_matches(selector, |matches| {
            matches
                .next()
                .and_then(|el| el.value().attr(name).map(str::to_string))
        })?
        .ok_or_else(|| ExtractError::absent(format!("{selector}@{name}")))
    }

    fn texts(&self, selector: &str) -> ExtractResult<Vec<String>> {
        self.with_matches(selector, |matches| matches.map(element_text).collect())
    }
}

fn parse_selector(selector: &str) -> ExtractResult<Selector> {
    Selector::parse(selector).map_err(|_| ExtractError::InvalidSelector {
        selector: selector.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r#"
        <article class="card" data-id="42">
            <h3 class="title"> Wireless <b>Mouse</b> </h3>
            <span class="a-price-whole">24.</span><span class="a-price-fraction">99</span>
            <a class="link" href="/dp/B0042">details</a>
            <ul><li>red</li><li>blue</li></ul>
        </article>
    "#;

    #[test]
    fn test_text_and_attr() {
        let item = HtmlItem::new(CARD);
        assert_eq!(item.text(".title").unwrap(), "Wireless Mouse");
        assert_eq!(item.attr("a.link", "href").unwrap(), "/dp/B0042");
        assert_eq!(item.texts("li").unwrap(), vec!["red", "blue"]);
        assert_eq!(item.nth_text("li", 1).unwrap(), "blue");
    }

    #[test]
    fn test_empty_selector_is_item_root() {
        let item = HtmlItem::new(CARD);
        assert_eq!(item.attr("", "data-id").unwrap(), "42");
    }

    #[test]
    fn test_absence_and_bad_selectors() {
        let item = HtmlItem::new(CARD);
        assert!(matches!(
            item.text(".missing"),
            Err(ExtractError::StructuralAbsence { .. })
        ));
        assert!(matches!(
            item.attr(".title", "href"),
            Err(ExtractError::StructuralAbsence { .. })
        ));
        assert!(item.texts(".missing").unwrap().is_empty());
        assert!(matches!(
            item.text("h3[["),
            Err(ExtractError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_snapshot_outlives_page() {
        let items: Vec<HtmlItem> = {
            let page = Html::parse_document(&format!("<main>{CARD}{CARD}</main>"));
            let selector = Selector::parse("article.card").unwrap();
            page.select(&selector).map(HtmlItem::from_element).collect()
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text(".title").unwrap(), "Wireless Mouse");
        assert_eq!(items[1].attr("", "data-id").unwrap(), "42");
    }

    #[test]
    fn test_malformed_markup_does_not_panic() {
        let item = HtmlItem::new("<div><span>unclosed <b>tags</div>");
        assert_eq!(item.text("span").unwrap(), "unclosed tags");
    }
}
