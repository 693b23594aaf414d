//! Dribbble shot search.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{
    fetch_json, parse_rfc3339, FeedItem, FetchError, HttpSettings, PageResult, PendingRequests,
    SearchClient,
};

pub const DEFAULT_BASE_URL: &str = "https://api.dribbble.com/v2";
pub const DEFAULT_PAGE_SIZE: u32 = 12;

#[derive(Debug, Deserialize)]
struct Shot {
    id: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

pub struct DribbbleSearchClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u32,
    pending: PendingRequests,
}

impl DribbbleSearchClient {
    pub fn new(
        settings: &HttpSettings,
        base_url: impl Into<String>,
        page_size: u32,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            http: settings.build_client()?,
            base_url: base_url.into(),
            page_size: page_size.max(1),
            pending: PendingRequests::new(),
        })
    }
}

#[async_trait]
impl SearchClient for DribbbleSearchClient {
    async fn search(&self, key: &str, query: &str, page: u32) -> PageResult {
        let guard = self.pending.track(key);
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        debug!(%url, query, page, "dribbble: searching shots");
        let request = self
            .http
            .get(url)
            .query(&[("q", query)])
            .query(&[("page", page), ("per_page", self.page_size)]);
        let shots: Vec<serde_json::Value> = fetch_json(request, guard.token()).await?;

        Ok(shots
            .into_iter()
            .filter_map(|raw| serde_json::from_value::<Shot>(raw).ok())
            .map(|shot| {
                let mut item = FeedItem::new(shot.id.to_string(), shot.title);
                item.description = shot.description;
                item.link = shot.html_url;
                item.published = parse_rfc3339(shot.published_at.as_deref());
                item
            })
            .collect())
    }

    fn cancel_request(&self, key: &str) {
        self.pending.cancel(key);
    }

    fn cancel_all_searches(&self) {
        self.pending.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_maps_shots() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "icons"))
            .and(query_param("page", "3"))
            .and(query_param("per_page", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 1,
                    "title": "Line icons",
                    "html_url": "https://dribbble.com/shots/1",
                    "published_at": "2023-11-11T11:11:11Z"
                },
                { "id": 2, "title": "Glyphs" }
            ])))
            .mount(&server)
            .await;

        let client = DribbbleSearchClient::new(&HttpSettings::default(), server.uri(), 5).unwrap();
        let items = client.search("dribbble-search:icons", "icons", 3).await.expect("search loads");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Line icons");
        assert_eq!(items[0].link.as_deref(), Some("https://dribbble.com/shots/1"));
        assert!(items[1].published.is_none());
    }

    #[tokio::test]
    async fn non_array_body_is_a_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let client = DribbbleSearchClient::new(&HttpSettings::default(), server.uri(), 5).unwrap();
        let err = client.search("dribbble-search:icons", "icons", 1).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
