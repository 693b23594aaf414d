//! The item type shared across all feed sources.
//!
//! `FeedItem` is a single entry from any backend (Designer News, Product Hunt,
//! Dribbble, RSS).  Every backend converts its native format into `FeedItem`s
//! so the aggregator and the UI can stay source-agnostic.
//!
//! ## Stamping
//!
//! Backends hand back *unstamped* items: `origin_key` is empty and `page` is
//! zero.  The aggregator stamps every item of a successful page with the key
//! of the source it was requested for and the 1-based page number, no matter
//! how the backend itself counts pages.

use chrono::{DateTime, Utc};

/// A single feed entry, normalised from any data source.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FeedItem {
    /// Identifier as reported by the backend.  Not unique across sources.
    pub id: String,

    /// Human-readable headline.
    pub title: String,

    /// Optional longer description or tagline.
    pub description: Option<String>,

    /// URL to the full content.
    pub link: Option<String>,

    /// Publication timestamp, if the backend provided one.
    pub published: Option<DateTime<Utc>>,

    /// Key of the source this item was fetched for.  Empty until stamped.
    pub origin_key: String,

    /// 1-based page this item arrived on.  Zero until stamped.
    pub page: u32,
}

impl FeedItem {
    /// Create an unstamped item.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            link: None,
            published: None,
            origin_key: String::new(),
            page: 0,
        }
    }

    /// Record which source and page this item belongs to.
    pub fn stamp(&mut self, origin_key: &str, page: u32) {
        self.origin_key = origin_key.to_string();
        self.page = page;
    }

    /// Whether the aggregator has stamped this item.
    pub fn is_stamped(&self) -> bool {
        !self.origin_key.is_empty() && self.page >= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_items_are_unstamped() {
        let item = FeedItem::new("1", "Hello");
        assert!(!item.is_stamped());
        assert_eq!(item.page, 0);
        assert!(item.origin_key.is_empty());
    }

    #[test]
    fn stamp_sets_key_and_page() {
        let mut item = FeedItem::new("1", "Hello");
        item.stamp("product-hunt", 3);
        assert!(item.is_stamped());
        assert_eq!(item.origin_key, "product-hunt");
        assert_eq!(item.page, 3);
    }

    #[test]
    fn restamping_overwrites() {
        let mut item = FeedItem::new("1", "Hello");
        item.stamp("a", 1);
        item.stamp("b", 2);
        assert_eq!(item.origin_key, "b");
        assert_eq!(item.page, 2);
    }
}
