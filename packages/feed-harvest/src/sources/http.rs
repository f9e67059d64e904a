//! Feed source over server-rendered result pages.
//!
//! This implementation:
//! - Uses reqwest to fetch pages
//! - Uses scraper to split each page into items
//! - Follows either a page-number query parameter or a "next" link
//!
//! Limitations:
//! - No JavaScript rendering (use for static HTML feeds only)

use async_trait::async_trait;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::{HarvestError, HarvestResult, SourceError, SourceResult};
use crate::sources::html::HtmlItem;
use crate::traits::source::FeedSource;

const DEFAULT_USER_AGENT: &str = concat!("feed-harvest/", env!("CARGO_PKG_VERSION"));

/// How the source moves from one page to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pagination {
    /// Increment a query parameter (`?page=2`)
    PageParam {
        name: String,
        #[serde(default = "default_first_page")]
        start: u32,
    },

    /// Follow the `href` of the first element matching `selector`
    NextLink { selector: String },
}

fn default_first_page() -> u32 {
    1
}

/// Configuration for [`HttpPagedSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSourceConfig {
    pub start_url: String,

    /// CSS selector matching one feed item
    pub item_selector: String,

    pub pagination: Pagination,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpSourceConfig {
    pub fn new(
        start_url: impl Into<String>,
        item_selector: impl Into<String>,
        pagination: Pagination,
    ) -> Self {
        Self {
            start_url: start_url.into(),
            item_selector: item_selector.into(),
            pagination,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }
}

/// One parsed result page.
#[derive(Debug, Clone)]
struct LoadedPage {
    url: Url,
    number: u32,
    items: Vec<HtmlItem>,
    next: Option<Url>,
}

/// A feed that walks result pages over HTTP.
///
/// The start page is loaded lazily by the first `current_items` call.
pub struct HttpPagedSource {
    client: reqwest::Client,
    config: HttpSourceConfig,
    start_url: Url,
    current: Option<LoadedPage>,
}

impl HttpPagedSource {
    pub fn new(config: HttpSourceConfig) -> HarvestResult<Self> {
        let start_url = Url::parse(&config.start_url).map_err(|_| SourceError::InvalidUrl {
            url: config.start_url.clone(),
        })?;

        check_selector(&config.item_selector)?;
        if let Pagination::NextLink { selector } = &config.pagination {
            check_selector(selector)?;
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SourceError::Unavailable(Box::new(e)))?;

        Ok(Self {
            client,
            config,
            start_url,
            current: None,
        })
    }

    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    /// URL of the page currently showing, if one is loaded.
    pub fn current_url(&self) -> Option<&Url> {
        self.current.as_ref().map(|page| &page.url)
    }

    /// Page number of the page currently showing, if one is loaded.
    pub fn current_page(&self) -> Option<u32> {
        self.current.as_ref().map(|page| page.number)
    }

    fn first_page_number(&self) -> u32 {
        match &self.config.pagination {
            Pagination::PageParam { start, .. } => *start,
            Pagination::NextLink { .. } => 1,
        }
    }

    /// The start URL with the page parameter set to `page`.
    fn page_url(&self, name: &str, page: u32) -> Url {
        let mut url = self.start_url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != name)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(&kept)
            .append_pair(name, &page.to_string());
        url
    }

    /// Fetch a page body; `Ok(None)` when the server says it does not exist.
    async fn fetch(&self, url: &Url) -> SourceResult<Option<String>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(Box::new(e)))?;

        let status = response.status();
        debug!(url = %url, status = %status, "Fetched page");

        if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::unavailable(format!("HTTP {status} for {url}")));
        }

        response
            .text()
            .await
            .map(Some)
            .map_err(|e| SourceError::Unavailable(Box::new(e)))
    }

    async fn load(&self, url: Url, number: u32) -> SourceResult<Option<LoadedPage>> {
        let Some(body) = self.fetch(&url).await? else {
            return Ok(None);
        };

        let next_selector = match &self.config.pagination {
            Pagination::NextLink { selector } => Some(selector.as_str()),
            Pagination::PageParam { .. } => None,
        };
        let (items, next) = parse_page(&body, &self.config.item_selector, next_selector, &url)?;

        Ok(Some(LoadedPage {
            url,
            number,
            items,
            next,
        }))
    }

    /// Load the start page; a missing start page means the feed is unusable.
    async fn load_start(&mut self) -> SourceResult<()> {
        let number = self.first_page_number();
        let url = self.start_url.clone();

        match self.load(url.clone(), number).await? {
            Some(page) => {
                info!(url = %url, items = page.items.len(), "Loaded start page");
                self.current = Some(page);
                Ok(())
            }
            None => Err(SourceError::unavailable(format!("start page not found: {url}"))),
        }
    }
}

#[async_trait]
impl FeedSource for HttpPagedSource {
    type Item = HtmlItem;

    async fn navigate(&mut self) -> SourceResult<()> {
        if self.current.is_none() {
            self.load_start().await?;
        }
        let Some(current) = &self.current else {
            return Err(SourceError::blocked("no page loaded"));
        };

        let number = current.number + 1;
        let url = match &self.config.pagination {
            Pagination::PageParam { name, .. } => self.page_url(name, number),
            Pagination::NextLink { .. } => match &current.next {
                Some(next) => next.clone(),
                None => return Err(SourceError::blocked("no next link")),
            },
        };

        let page = match self.load(url.clone(), number).await? {
            Some(page) => page,
            None => return Err(SourceError::blocked(format!("page not found: {url}"))),
        };
        if page.items.is_empty() {
            return Err(SourceError::blocked(format!("no items on {url}")));
        }

        debug!(url = %url, page = number, items = page.items.len(), "Advanced to next page");
        self.current = Some(page);
        Ok(())
    }

    async fn current_items(&mut self) -> SourceResult<Vec<HtmlItem>> {
        if self.current.is_none() {
            self.load_start().await?;
        }
        Ok(self
            .current
            .as_ref()
            .map(|page| page.items.clone())
            .unwrap_or_default())
    }

    async fn hard_reset(&mut self) -> SourceResult<()> {
        self.current = None;
        self.load_start().await
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn check_selector(selector: &str) -> HarvestResult<()> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|_| HarvestError::Config(format!("invalid selector: {selector}")))
}

/// Split a page into items and find the next link.
///
/// Kept synchronous so the parsed document never lives across an await.
fn parse_page(
    body: &str,
    item_selector: &str,
    next_selector: Option<&str>,
    base: &Url,
) -> SourceResult<(Vec<HtmlItem>, Option<Url>)> {
    let document = Html::parse_document(body);

    let items_sel = Selector::parse(item_selector)
        .map_err(|_| SourceError::unavailable(format!("invalid selector: {item_selector}")))?;
    let items = document.select(&items_sel).map(HtmlItem::from_element).collect();

    let next = match next_selector {
        Some(raw) => {
            let next_sel = Selector::parse(raw)
                .map_err(|_| SourceError::unavailable(format!("invalid selector: {raw}")))?;
            document
                .select(&next_sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| base.join(href.trim()).ok())
        }
        None => None,
    };

    Ok((items, next))
}
