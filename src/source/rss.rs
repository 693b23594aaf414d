//! Paged RSS feed backend.
//!
//! Plain RSS has no pagination, but most blog engines (WordPress, and the
//! many that copied it) accept a `paged=N` query parameter counting from 1.
//! One client serves every `rss:<url>` source; the feed URL plays the role
//! of the search query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    fetch_bytes, FeedItem, FetchError, HttpSettings, PageResult, PendingRequests, SearchClient,
};

pub struct RssClient {
    http: reqwest::Client,
    pending: PendingRequests,
}

impl RssClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        Ok(Self {
            http: settings.build_client()?,
            pending: PendingRequests::new(),
        })
    }

    /// Parse an already-fetched [`rss::Channel`] into unstamped [`FeedItem`]s.
    ///
    /// Pure (no I/O) so tests can exercise it without the network.
    pub fn parse_channel(channel: &rss::Channel) -> Vec<FeedItem> {
        channel
            .items()
            .iter()
            .map(|item| {
                // Prefer <guid>, fall back to <link>, then empty string.
                let id = item
                    .guid()
                    .map(|g| g.value().to_string())
                    .or_else(|| item.link().map(String::from))
                    .unwrap_or_default();

                let mut feed_item = FeedItem::new(id, item.title().unwrap_or("(untitled)"));
                feed_item.description = item.description().map(String::from);
                feed_item.link = item.link().map(String::from);
                feed_item.published = item
                    .pub_date()
                    .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                    .map(|dt| dt.with_timezone(&Utc));
                feed_item
            })
            .collect()
    }
}

#[async_trait]
impl SearchClient for RssClient {
    async fn search(&self, key: &str, url: &str, page: u32) -> PageResult {
        let guard = self.pending.track(key);
        debug!(url, page, "rss: loading feed page");
        let request = self.http.get(url).query(&[("paged", page)]);
        let body = fetch_bytes(request, guard.token()).await?;
        let channel = rss::Channel::read_from(body.as_ref())
            .map_err(|err| FetchError::Decode(err.to_string()))?;
        Ok(Self::parse_channel(&channel))
    }

    fn cancel_request(&self, key: &str) {
        self.pending.cancel(key);
    }

    fn cancel_all_searches(&self) {
        self.pending.cancel_all();
    }
}
