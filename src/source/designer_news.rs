//! Designer News backends: the popular stories feed and story search.
//!
//! Both endpoints count pages from 1 and answer with
//! `{ "stories": [ ... ] }`.  Stories that fail to decode are skipped.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{
    fetch_json, parse_rfc3339, FeedItem, FetchError, HttpSettings, PageResult, PagedClient,
    PendingRequests, SearchClient,
};

pub const DEFAULT_BASE_URL: &str = "https://api.designernews.co";

#[derive(Debug, Deserialize)]
struct StoriesResponse {
    #[serde(default)]
    stories: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Story {
    id: serde_json::Value,
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

fn parse_stories(response: StoriesResponse) -> Vec<FeedItem> {
    response
        .stories
        .into_iter()
        .filter_map(|raw| serde_json::from_value::<Story>(raw).ok())
        .map(|story| {
            let id = match &story.id {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let mut item = FeedItem::new(id, story.title);
            item.description = story.comment.filter(|c| !c.is_empty());
            item.link = story.url;
            item.published = parse_rfc3339(story.created_at.as_deref());
            item
        })
        .collect()
}

/// The Designer News popular stories feed.
pub struct DesignerNewsClient {
    http: reqwest::Client,
    base_url: String,
    pending: PendingRequests,
}

impl DesignerNewsClient {
    pub fn new(settings: &HttpSettings, base_url: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            http: settings.build_client()?,
            base_url: base_url.into(),
            pending: PendingRequests::new(),
        })
    }
}

#[async_trait]
impl PagedClient for DesignerNewsClient {
    async fn load(&self, key: &str, page: u32) -> PageResult {
        let guard = self.pending.track(key);
        let url = format!("{}/api/v2/stories", self.base_url.trim_end_matches('/'));
        debug!(%url, page, "designer news: loading popular stories");
        let request = self.http.get(url).query(&[("page", page)]);
        let response: StoriesResponse = fetch_json(request, guard.token()).await?;
        Ok(parse_stories(response))
    }

    fn cancel_request(&self, key: &str) {
        self.pending.cancel(key);
    }

    fn cancel_all_requests(&self) {
        self.pending.cancel_all();
    }
}

/// Designer News story search.  One search source per query.
pub struct DesignerNewsSearchClient {
    http: reqwest::Client,
    base_url: String,
    pending: PendingRequests,
}

impl DesignerNewsSearchClient {
    pub fn new(settings: &HttpSettings, base_url: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            http: settings.build_client()?,
            base_url: base_url.into(),
            pending: PendingRequests::new(),
        })
    }
}

#[async_trait]
impl SearchClient for DesignerNewsSearchClient {
    async fn search(&self, key: &str, query: &str, page: u32) -> PageResult {
        let guard = self.pending.track(key);
        let url = format!(
            "{}/api/v2/stories/search",
            self.base_url.trim_end_matches('/')
        );
        debug!(%url, query, page, "designer news: searching");
        let request = self
            .http
            .get(url)
            .query(&[("query", query)])
            .query(&[("page", page)]);
        let response: StoriesResponse = fetch_json(request, guard.token()).await?;
        Ok(parse_stories(response))
    }

    fn cancel_request(&self, key: &str) {
        self.pending.cancel(key);
    }

    fn cancel_all_searches(&self) {
        self.pending.cancel_all();
    }
}
