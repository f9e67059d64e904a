//! Feed source implementations.
//!
//! - `HttpPagedSource` - static HTML result pages over HTTP
//! - `HtmlItem` - owned HTML snapshot implementing `ItemView`

pub mod html;
pub mod http;

pub use html::HtmlItem;
pub use http::{HttpPagedSource, HttpSourceConfig, Pagination};
