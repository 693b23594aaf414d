//! Data source abstraction layer.
//!
//! This module defines the [`Source`] model, the closed [`SourceKind`] union
//! the aggregator dispatches on, and the two client traits every backend
//! implements: [`PagedClient`] for fixed feeds and [`SearchClient`] for
//! query-bearing ones.  Concrete backends live in sub-modules.
//!
//! ## Adding a new backend
//!
//! 1. Create a new file in this directory (e.g. `behance.rs`).
//! 2. Implement [`PagedClient`] or [`SearchClient`] for it.  Declare its
//!    [`PageBase`] if it counts pages from zero; never adjust page numbers
//!    anywhere else.
//! 3. Add a [`SourceKind`] variant and its discriminator string below.
//! 4. Add a field to [`crate::aggregator::Backends`] and a dispatch arm.

mod designer_news;
mod dribbble;
mod feed_item;
mod pending;
mod product_hunt;
mod registry;
mod rss;

pub use designer_news::{
    DesignerNewsClient, DesignerNewsSearchClient, DEFAULT_BASE_URL as DESIGNER_NEWS_BASE_URL,
};
pub use dribbble::{
    DribbbleSearchClient, DEFAULT_BASE_URL as DRIBBBLE_BASE_URL,
    DEFAULT_PAGE_SIZE as DRIBBBLE_PAGE_SIZE,
};
pub use feed_item::FeedItem;
pub use pending::PendingRequests;
pub use product_hunt::{ProductHuntClient, DEFAULT_BASE_URL as PRODUCT_HUNT_BASE_URL};
pub use registry::{RegistryError, SourceRegistry};
pub use rss::RssClient;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Key of the Designer News popular feed.
pub const DESIGNER_NEWS_POPULAR: &str = "designer-news-popular";
/// Key of the Product Hunt feed.
pub const PRODUCT_HUNT: &str = "product-hunt";

const DRIBBBLE_SEARCH_PREFIX: &str = "dribbble-search:";
const DESIGNER_NEWS_SEARCH_PREFIX: &str = "designer-news-search:";
const RSS_PREFIX: &str = "rss:";

/// A configured, independently paginated feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// Stable key, unique across the registry.
    pub key: String,
    /// Label shown in the filter bar.
    pub name: String,
    pub kind: SourceKind,
    pub active: bool,
}

impl Source {
    /// Build a source whose key is its kind discriminator.
    pub fn from_kind(kind: SourceKind, active: bool) -> Self {
        let key = kind.to_string();
        Self {
            name: kind.default_name(),
            key,
            kind,
            active,
        }
    }
}

/// The closed set of source variants, each carrying what its backend needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    DesignerNewsPopular,
    ProductHunt,
    DribbbleSearch { query: String },
    DesignerNewsSearch { query: String },
    Rss { url: String },
    /// A discriminator this build does not know.  Never dispatched.
    Unsupported(String),
}

impl SourceKind {
    /// Parse a kind discriminator such as `dribbble-search:material design`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == DESIGNER_NEWS_POPULAR {
            return SourceKind::DesignerNewsPopular;
        }
        if raw == PRODUCT_HUNT {
            return SourceKind::ProductHunt;
        }
        if let Some(query) = non_empty_suffix(raw, DRIBBBLE_SEARCH_PREFIX) {
            return SourceKind::DribbbleSearch { query };
        }
        if let Some(query) = non_empty_suffix(raw, DESIGNER_NEWS_SEARCH_PREFIX) {
            return SourceKind::DesignerNewsSearch { query };
        }
        if let Some(url) = non_empty_suffix(raw, RSS_PREFIX) {
            return SourceKind::Rss { url };
        }
        SourceKind::Unsupported(raw.to_string())
    }

    /// Label used when the configuration does not name a source.
    pub fn default_name(&self) -> String {
        match self {
            SourceKind::DesignerNewsPopular => "Designer News".into(),
            SourceKind::ProductHunt => "Product Hunt".into(),
            SourceKind::DribbbleSearch { query } => format!("Dribbble: {query}"),
            SourceKind::DesignerNewsSearch { query } => format!("DN: {query}"),
            SourceKind::Rss { url } => url.clone(),
            SourceKind::Unsupported(raw) => raw.clone(),
        }
    }
}

fn non_empty_suffix(raw: &str, prefix: &str) -> Option<String> {
    raw.strip_prefix(prefix)
        .map(str::trim)
        .filter(|rest| !rest.is_empty())
        .map(String::from)
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::DesignerNewsPopular => f.write_str(DESIGNER_NEWS_POPULAR),
            SourceKind::ProductHunt => f.write_str(PRODUCT_HUNT),
            SourceKind::DribbbleSearch { query } => write!(f, "{DRIBBBLE_SEARCH_PREFIX}{query}"),
            SourceKind::DesignerNewsSearch { query } => {
                write!(f, "{DESIGNER_NEWS_SEARCH_PREFIX}{query}")
            }
            SourceKind::Rss { url } => write!(f, "{RSS_PREFIX}{url}"),
            SourceKind::Unsupported(raw) => f.write_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for SourceKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(SourceKind::parse(&raw))
    }
}

/// Well-known fixed source keys.  A key match here wins over the source's
/// declared [`SourceKind`] when the aggregator picks a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedKind {
    DesignerNewsPopular,
    ProductHunt,
}

impl FixedKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            DESIGNER_NEWS_POPULAR => Some(FixedKind::DesignerNewsPopular),
            PRODUCT_HUNT => Some(FixedKind::ProductHunt),
            _ => None,
        }
    }
}

/// How a backend numbers its pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageBase {
    #[default]
    OneBased,
    ZeroBased,
}

impl PageBase {
    /// Translate a logical 1-based page into the backend's own numbering.
    pub fn translate(self, page: u32) -> u32 {
        match self {
            PageBase::OneBased => page,
            PageBase::ZeroBased => page.saturating_sub(1),
        }
    }
}

/// Why a single page request failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("http status {0}")]
    Status(u16),
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Result of one page request.
pub type PageResult = Result<Vec<FeedItem>, FetchError>;

/// A backend serving one fixed feed.
#[async_trait]
pub trait PagedClient: Send + Sync {
    /// How this backend counts pages.  Defaults to 1-based.
    fn page_base(&self) -> PageBase {
        PageBase::OneBased
    }

    /// Fetch one page for the source `key`, numbered in this backend's own
    /// [`PageBase`].  The request is tracked under `key` until it finishes.
    async fn load(&self, key: &str, page: u32) -> PageResult;

    /// Abort backend-side work tracked for `key`.
    fn cancel_request(&self, key: &str);

    /// Abort every request this backend is working on.
    fn cancel_all_requests(&self);
}

/// A backend serving parameterised feeds, one per query string.
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Fetch one 1-based page of results for `query` on behalf of the source
    /// `key`.
    async fn search(&self, key: &str, query: &str, page: u32) -> PageResult;

    /// Abort backend-side work tracked for `key`.
    fn cancel_request(&self, key: &str);

    /// Abort every search this backend is working on.
    fn cancel_all_searches(&self);
}

/// Shared HTTP client settings for all backends.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl HttpSettings {
    pub fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        Ok(reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(self.user_agent.clone())
            .build()?)
    }
}

/// Send `request`, failing on non-2xx, and decode the JSON body.
///
/// The request is raced against `token`; a cancelled token wins.
pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
    token: &CancellationToken,
) -> Result<T, FetchError> {
    let body = fetch_bytes(request, token).await?;
    serde_json::from_slice(&body).map_err(|err| FetchError::Decode(err.to_string()))
}

/// Send `request`, failing on non-2xx, and return the raw body.
pub(crate) async fn fetch_bytes(
    request: reqwest::RequestBuilder,
    token: &CancellationToken,
) -> Result<bytes::Bytes, FetchError> {
    let exchange = async {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.bytes().await?)
    };

    tokio::select! {
        () = token.cancelled() => Err(FetchError::Cancelled),
        result = exchange => result,
    }
}

/// Parse an RFC 3339 timestamp, ignoring malformed values.
pub(crate) fn parse_rfc3339(raw: Option<&str>) -> Option<chrono::DateTime<chrono::Utc>> {
    raw.and_then(|d| chrono::DateTime::parse_from_rfc3339(d).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_kinds() {
        assert_eq!(
            SourceKind::parse("designer-news-popular"),
            SourceKind::DesignerNewsPopular
        );
        assert_eq!(SourceKind::parse("product-hunt"), SourceKind::ProductHunt);
    }

    #[test]
    fn parses_parameterised_kinds() {
        assert_eq!(
            SourceKind::parse("dribbble-search:material design"),
            SourceKind::DribbbleSearch {
                query: "material design".into()
            }
        );
        assert_eq!(
            SourceKind::parse("designer-news-search: typography "),
            SourceKind::DesignerNewsSearch {
                query: "typography".into()
            }
        );
        assert_eq!(
            SourceKind::parse("rss:https://example.com/feed"),
            SourceKind::Rss {
                url: "https://example.com/feed".into()
            }
        );
    }

    #[test]
    fn empty_query_is_unsupported() {
        assert!(matches!(
            SourceKind::parse("dribbble-search:"),
            SourceKind::Unsupported(_)
        ));
        assert!(matches!(
            SourceKind::parse("behance"),
            SourceKind::Unsupported(_)
        ));
    }

    #[test]
    fn display_round_trips_discriminator() {
        for raw in [
            "designer-news-popular",
            "product-hunt",
            "dribbble-search:icons",
            "designer-news-search:css",
            "rss:https://example.com/feed",
        ] {
            assert_eq!(SourceKind::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn fixed_kind_matches_well_known_keys_only() {
        assert_eq!(
            FixedKind::from_key("product-hunt"),
            Some(FixedKind::ProductHunt)
        );
        assert_eq!(FixedKind::from_key("dribbble-search:x"), None);
    }

    #[test]
    fn zero_based_translation() {
        assert_eq!(PageBase::OneBased.translate(1), 1);
        assert_eq!(PageBase::ZeroBased.translate(1), 0);
        assert_eq!(PageBase::ZeroBased.translate(4), 3);
    }

    #[test]
    fn from_kind_uses_discriminator_as_key() {
        let src = Source::from_kind(
            SourceKind::DribbbleSearch {
                query: "icons".into(),
            },
            true,
        );
        assert_eq!(src.key, "dribbble-search:icons");
        assert_eq!(src.name, "Dribbble: icons");
        assert!(src.active);
    }
}
