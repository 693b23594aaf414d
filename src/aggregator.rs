//! The aggregator: one orchestrator for every source's paging.
//!
//! ## How a page is loaded
//!
//! ```text
//! load_source ──► PaginationTracker::next_page ──► backend (spawned task)
//!      │                                                  │
//!      └──► InFlightRegistry::register            Completion (channel)
//!                                                         │
//!                         poll_completions / next_completion ◄┘
//!                                   │
//!                   stamp + FeedEvent::BatchLoaded, or discard
//! ```
//!
//! All cursor and in-flight bookkeeping happens on the thread that owns the
//! `Aggregator`.  Backends run as tokio tasks and only ever talk back through
//! the completion channel, so no state here is touched concurrently.
//!
//! Every dispatched request produces exactly one [`Completion`]: the task
//! races the backend future against the request's cancellation token and
//! reports `Cancelled` if the token wins.  That keeps `LoadStarted` and
//! `LoadFinished` balanced on every path.
//!
//! A `load_source` for a key that already has a request in flight is skipped,
//! so at most one request per source is ever outstanding and results of one
//! source arrive in page order.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{mpsc, Arc};

use tokio::runtime::Handle;
use tokio::sync::mpsc as async_mpsc;
use tracing::{debug, info, warn};

use crate::config::Endpoints;
use crate::inflight::{InFlightRegistry, RequestHandle};
use crate::pagination::PaginationTracker;
use crate::source::{
    DesignerNewsClient, DesignerNewsSearchClient, DribbbleSearchClient, FeedItem, FetchError,
    FixedKind, HttpSettings, PageResult, PagedClient, ProductHuntClient, RssClient, SearchClient,
    Source, SourceKind, SourceRegistry,
};

/// What the aggregator reports to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// A request was dispatched.
    LoadStarted,
    /// A dispatched request reached a terminal state.
    LoadFinished,
    /// A non-empty, stamped page from a source that is still enabled.
    BatchLoaded(Vec<FeedItem>),
}

/// Terminal outcome of one dispatched request.
#[derive(Debug)]
pub struct Completion {
    key: String,
    request_id: u64,
    page: u32,
    outcome: PageResult,
}

/// One client per backend kind, shared across every source of that kind.
#[derive(Clone)]
pub struct Backends {
    pub designer_news: Arc<dyn PagedClient>,
    pub product_hunt: Arc<dyn PagedClient>,
    pub dribbble: Arc<dyn SearchClient>,
    pub designer_news_search: Arc<dyn SearchClient>,
    pub rss: Arc<dyn SearchClient>,
}

impl Backends {
    /// Build the HTTP backends.
    pub fn connect(http: &HttpSettings, endpoints: &Endpoints) -> Result<Self, FetchError> {
        Ok(Self {
            designer_news: Arc::new(DesignerNewsClient::new(http, &endpoints.designer_news)?),
            product_hunt: Arc::new(ProductHuntClient::new(
                http,
                &endpoints.product_hunt,
                endpoints.product_hunt_token.clone(),
            )?),
            dribbble: Arc::new(DribbbleSearchClient::new(
                http,
                &endpoints.dribbble,
                endpoints.dribbble_page_size,
            )?),
            designer_news_search: Arc::new(DesignerNewsSearchClient::new(
                http,
                &endpoints.designer_news,
            )?),
            rss: Arc::new(RssClient::new(http)?),
        })
    }

    fn paged(&self) -> [&Arc<dyn PagedClient>; 2] {
        [&self.designer_news, &self.product_hunt]
    }

    fn searches(&self) -> [&Arc<dyn SearchClient>; 3] {
        [&self.dribbble, &self.designer_news_search, &self.rss]
    }
}

/// The backend a source dispatches to.
enum Target {
    Paged(Arc<dyn PagedClient>),
    Search(Arc<dyn SearchClient>, String),
}

impl Target {
    /// Pick the backend for `source`.
    ///
    /// A well-known fixed key wins over the declared kind; otherwise the
    /// kind decides.  `None` means the source is ignored.
    fn resolve(backends: &Backends, source: &Source) -> Option<Self> {
        match FixedKind::from_key(&source.key) {
            Some(FixedKind::DesignerNewsPopular) => {
                return Some(Target::Paged(backends.designer_news.clone()))
            }
            Some(FixedKind::ProductHunt) => {
                return Some(Target::Paged(backends.product_hunt.clone()))
            }
            None => {}
        }
        match &source.kind {
            SourceKind::DesignerNewsPopular => Some(Target::Paged(backends.designer_news.clone())),
            SourceKind::ProductHunt => Some(Target::Paged(backends.product_hunt.clone())),
            SourceKind::DribbbleSearch { query } => {
                Some(Target::Search(backends.dribbble.clone(), query.clone()))
            }
            SourceKind::DesignerNewsSearch { query } => Some(Target::Search(
                backends.designer_news_search.clone(),
                query.clone(),
            )),
            SourceKind::Rss { url } => Some(Target::Search(backends.rss.clone(), url.clone())),
            SourceKind::Unsupported(_) => None,
        }
    }

    fn cancel_request(&self, key: &str) {
        match self {
            Target::Paged(client) => client.cancel_request(key),
            Target::Search(client, _) => client.cancel_request(key),
        }
    }

    /// The request future for logical 1-based `page` of the source `key`.
    fn fetch(self, key: String, page: u32) -> Pin<Box<dyn Future<Output = PageResult> + Send>> {
        match self {
            Target::Paged(client) => {
                // The only place a backend's page base is applied.
                let backend_page = client.page_base().translate(page);
                Box::pin(async move { client.load(&key, backend_page).await })
            }
            Target::Search(client, query) => {
                Box::pin(async move { client.search(&key, &query, page).await })
            }
        }
    }
}

pub struct Aggregator {
    registry: SourceRegistry,
    backends: Backends,
    runtime: Handle,
    pages: PaginationTracker,
    inflight: InFlightRegistry,
    /// Requests cancelled by deactivation whose completion is still due.
    revoked: HashSet<u64>,
    next_request_id: u64,
    outstanding: usize,
    completions_tx: async_mpsc::UnboundedSender<Completion>,
    completions_rx: async_mpsc::UnboundedReceiver<Completion>,
    events: mpsc::Sender<FeedEvent>,
}

impl Aggregator {
    pub fn new(
        registry: SourceRegistry,
        backends: Backends,
        runtime: Handle,
        events: mpsc::Sender<FeedEvent>,
    ) -> Self {
        let (completions_tx, completions_rx) = async_mpsc::unbounded_channel();
        let mut aggregator = Self {
            registry,
            backends,
            runtime,
            pages: PaginationTracker::new(),
            inflight: InFlightRegistry::new(),
            revoked: HashSet::new(),
            next_request_id: 0,
            outstanding: 0,
            completions_tx,
            completions_rx,
            events,
        };
        aggregator.sync_known_sources();
        aggregator
    }

    /// Forward registry toggles into a channel the owning thread can drain.
    ///
    /// Feed each received source to [`Aggregator::on_filter_changed`].
    pub fn filter_changes(registry: &SourceRegistry) -> mpsc::Receiver<Source> {
        let (tx, rx) = mpsc::channel();
        registry.register_change_callback(move |source| {
            let _ = tx.send(source.clone());
        });
        rx
    }

    fn sync_known_sources(&mut self) {
        let sources = self.registry.filters();
        self.pages.sync_keys(sources.iter().map(|s| s.key.as_str()));
    }

    fn emit(&self, event: FeedEvent) {
        // The receiver is gone only while the UI is shutting down.
        let _ = self.events.send(event);
    }

    /// Load the next page of every active source.
    pub fn load_all(&mut self) {
        self.sync_known_sources();
        for source in self.registry.filters() {
            if source.active {
                self.load_source(&source);
            }
        }
    }

    /// Cancel every outstanding request, here and inside every backend.
    ///
    /// Cursors are left alone.  Each cancelled request still completes with
    /// a `Cancelled` failure, which emits its `LoadFinished`.
    pub fn cancel_loading(&mut self) {
        let cancelled = self.inflight.cancel_all();
        if !cancelled.is_empty() {
            info!(count = cancelled.len(), "cancelled in-flight requests");
        }
        for client in self.backends.paged() {
            client.cancel_all_requests();
        }
        for client in self.backends.searches() {
            client.cancel_all_searches();
        }
    }

    /// React to a source being switched on or off.
    pub fn on_filter_changed(&mut self, source: &Source) {
        if source.active {
            self.sync_known_sources();
            self.load_source(source);
        } else {
            self.deactivate(source);
        }
    }

    fn deactivate(&mut self, source: &Source) {
        if let Some(request_id) = self.inflight.get(&source.key).map(RequestHandle::id) {
            self.revoked.insert(request_id);
            self.inflight.cancel(&source.key);
            debug!(key = %source.key, request_id, "cancelled request of deactivated source");
        }
        if let Some(target) = Target::resolve(&self.backends, source) {
            target.cancel_request(&source.key);
        }
        self.pages.reset(&source.key);
        info!(key = %source.key, "source deactivated");
    }

    fn load_source(&mut self, source: &Source) {
        if !source.active {
            return;
        }
        if self.inflight.contains(&source.key) {
            debug!(key = %source.key, "already loading, skipping");
            return;
        }
        let Some(target) = Target::resolve(&self.backends, source) else {
            debug!(key = %source.key, kind = %source.kind, "no backend for source, ignoring");
            return;
        };

        self.emit(FeedEvent::LoadStarted);
        let page = self.pages.next_page(&source.key);

        self.next_request_id += 1;
        let handle = RequestHandle::new(self.next_request_id);
        let token = handle.token().clone();
        let completion_tx = self.completions_tx.clone();
        let key = source.key.clone();
        let request_id = handle.id();
        let fetch = target.fetch(key.clone(), page);

        debug!(%key, page, request_id, "dispatching page request");
        self.inflight.register(&source.key, handle);
        self.outstanding += 1;

        self.runtime.spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => Err(FetchError::Cancelled),
                result = fetch => result,
            };
            // The receiver lives as long as the aggregator.
            let _ = completion_tx.send(Completion {
                key,
                request_id,
                page,
                outcome,
            });
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        let Completion {
            key,
            request_id,
            page,
            outcome,
        } = completion;

        self.outstanding = self.outstanding.saturating_sub(1);
        self.emit(FeedEvent::LoadFinished);
        self.inflight.remove_if(&key, request_id);
        let revoked = self.revoked.remove(&request_id);

        match outcome {
            Ok(mut items) => {
                if items.is_empty() {
                    debug!(%key, page, "empty page");
                    return;
                }
                if revoked || !self.pages.is_enabled(&key) {
                    debug!(%key, page, "discarding result of deactivated source");
                    return;
                }
                for item in &mut items {
                    item.stamp(&key, page);
                }
                debug!(%key, page, count = items.len(), "page loaded");
                self.emit(FeedEvent::BatchLoaded(items));
            }
            Err(err) if err.is_cancelled() => {
                debug!(%key, page, "request cancelled");
            }
            Err(err) => {
                warn!(%key, page, error = %err, "page request failed");
            }
        }
    }

    /// Apply every completion that has already arrived.  Never blocks.
    pub fn poll_completions(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.handle_completion(completion);
            handled += 1;
        }
        handled
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns `false` without waiting when nothing is outstanding.
    pub async fn next_completion(&mut self) -> bool {
        if self.outstanding == 0 {
            return false;
        }
        match self.completions_rx.recv().await {
            Some(completion) => {
                self.handle_completion(completion);
                true
            }
            None => false,
        }
    }

    /// Requests dispatched whose completion has not been applied yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.inflight.contains(key)
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    pub fn cursor(&self, key: &str) -> u32 {
        self.pages.cursor(key)
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }
}
