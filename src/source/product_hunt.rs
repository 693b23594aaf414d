//! Product Hunt backend.
//!
//! Product Hunt pages by day: `days_ago=0` is today, `days_ago=1` yesterday
//! and so on, so this backend counts pages from zero.  It declares
//! [`PageBase::ZeroBased`] and receives already-translated page numbers.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{
    fetch_json, parse_rfc3339, FeedItem, FetchError, HttpSettings, PageBase, PageResult,
    PagedClient, PendingRequests,
};

pub const DEFAULT_BASE_URL: &str = "https://api.producthunt.com";

#[derive(Debug, Deserialize)]
struct PostsResponse {
    #[serde(default)]
    posts: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: u64,
    name: String,
    #[serde(default)]
    tagline: Option<String>,
    #[serde(default)]
    discussion_url: Option<String>,
    #[serde(default)]
    redirect_url: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

pub struct ProductHuntClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    pending: PendingRequests,
}

impl ProductHuntClient {
    pub fn new(
        settings: &HttpSettings,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            http: settings.build_client()?,
            base_url: base_url.into(),
            token,
            pending: PendingRequests::new(),
        })
    }
}

#[async_trait]
impl PagedClient for ProductHuntClient {
    fn page_base(&self) -> PageBase {
        PageBase::ZeroBased
    }

    async fn load(&self, key: &str, days_ago: u32) -> PageResult {
        let guard = self.pending.track(key);
        let url = format!("{}/v1/posts", self.base_url.trim_end_matches('/'));
        debug!(%url, days_ago, "product hunt: loading posts");
        let mut request = self.http.get(url).query(&[("days_ago", days_ago)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response: PostsResponse = fetch_json(request, guard.token()).await?;

        Ok(response
            .posts
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<Post>(raw).ok())
            .map(|post| {
                let mut item = FeedItem::new(post.id.to_string(), post.name);
                item.description = post.tagline;
                item.link = post.discussion_url.or(post.redirect_url);
                item.published = parse_rfc3339(post.created_at.as_deref());
                item
            })
            .collect())
    }

    fn cancel_request(&self, key: &str) {
        self.pending.cancel(key);
    }

    fn cancel_all_requests(&self) {
        self.pending.cancel_all();
    }
}
