//! Per-source page cursors.
//!
//! A cursor holds the number of pages requested since the source was last
//! reset.  Zero means nothing has been requested, so the next request is
//! page 1.  Cursors always count 1-based pages; backends that number pages
//! differently translate at dispatch time and never here.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct PaginationTracker {
    cursors: HashMap<String, u32>,
}

impl PaginationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure every key in `keys` has a cursor.  Existing cursors are kept.
    pub fn sync_keys<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>) {
        for key in keys {
            self.cursors.entry(key.to_string()).or_insert(0);
        }
    }

    /// Return the page to fetch next for `key` and advance the cursor.
    ///
    /// Read and commit in one: call this only right before dispatching the
    /// request for the returned page.
    pub fn next_page(&mut self, key: &str) -> u32 {
        let cursor = self.cursors.entry(key.to_string()).or_insert(0);
        *cursor += 1;
        *cursor
    }

    /// Start `key` over from page 1.
    pub fn reset(&mut self, key: &str) {
        self.cursors.insert(key.to_string(), 0);
    }

    /// True iff a page has been requested for `key` since its last reset.
    ///
    /// This is "has been requested", not "has loaded": a source whose first
    /// request failed is still enabled.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.cursor(key) != 0
    }

    pub fn cursor(&self, key: &str) -> u32 {
        self.cursors.get(key).copied().unwrap_or(0)
    }
}
