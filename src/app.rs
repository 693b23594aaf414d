use ratatui::widgets::ListState;

use crate::aggregator::FeedEvent;
use crate::source::FeedItem;

/// One entry of the filter bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterView {
    pub key: String,
    pub name: String,
    pub active: bool,
    /// A page request is outstanding.
    pub loading: bool,
    /// Pages requested since the source was switched on.
    pub pages: u32,
}

pub struct App {
    /// Merged items of every source, page 1s first, then page 2s, ...
    pub items: Vec<FeedItem>,
    /// Filter bar state, refreshed by the main loop.
    pub filters: Vec<FilterView>,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last status message.
    pub status: String,
    /// Requests started and not yet finished.
    pub busy: usize,
}

impl App {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            filters: Vec::new(),
            list_state: ListState::default(),
            quit: false,
            status: "Starting…".into(),
            busy: 0,
        }
    }

    /// Apply one aggregator event.
    pub fn apply(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::LoadStarted => self.busy += 1,
            FeedEvent::LoadFinished => self.busy = self.busy.saturating_sub(1),
            FeedEvent::BatchLoaded(items) => {
                let count = items.len();
                let origin = items
                    .first()
                    .map(|i| i.origin_key.clone())
                    .unwrap_or_default();
                self.merge_batch(items);
                self.status = format!("Loaded {count} items from {origin}");
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.busy > 0
    }

    /// Append a batch, keeping items ordered by page.
    ///
    /// The sort is stable, so within a page items keep arrival order.
    pub fn merge_batch(&mut self, batch: Vec<FeedItem>) {
        self.items.extend(batch);
        self.items.sort_by_key(|item| item.page);
    }

    /// Drop every item of a source that was switched off.
    pub fn remove_source(&mut self, key: &str) {
        self.items.retain(|item| item.origin_key != key);
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        match (self.list_state.selected(), self.items.len()) {
            (Some(_), 0) => self.list_state.select(None),
            (Some(i), len) if i >= len => self.list_state.select(Some(len - 1)),
            _ => {}
        }
    }

    /// True when the selection sits on the last item: time to load more.
    pub fn at_end(&self) -> bool {
        !self.items.is_empty() && self.list_state.selected() == Some(self.items.len() - 1)
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.items.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.items.is_empty() {
            self.list_state.select(Some(self.items.len() - 1));
        }
    }
}
