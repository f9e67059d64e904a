//! Core trait abstractions for feed harvesting.
//!
//! These traits define the interfaces that rendering layers implement to
//! expose a feed to the collection engine.

pub mod item;
pub mod source;

pub use item::ItemView;
pub use source::FeedSource;
