//! Backend-side bookkeeping of outstanding requests.
//!
//! The aggregator only knows about the handles it registered.  Backends may
//! have more going on (a search that was started by someone else, a request
//! whose handle was already overwritten), so each backend tracks its own work
//! here and can abort all of it on `cancel_all`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct PendingRequests {
    next_id: AtomicU64,
    entries: Mutex<HashMap<String, Vec<(u64, CancellationToken)>>>,
}

/// Removes its entry from [`PendingRequests`] when dropped.
pub struct PendingGuard<'a> {
    owner: &'a PendingRequests,
    key: String,
    id: u64,
    token: CancellationToken,
}

impl PendingGuard<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.owner.finish(&self.key, self.id);
    }
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<(u64, CancellationToken)>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a request for `key`.  The entry lives as long as the guard.
    pub fn track(&self, key: &str) -> PendingGuard<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.entries()
            .entry(key.to_string())
            .or_default()
            .push((id, token.clone()));
        PendingGuard {
            owner: self,
            key: key.to_string(),
            id,
            token,
        }
    }

    fn finish(&self, key: &str, id: u64) {
        let mut entries = self.entries();
        if let Some(list) = entries.get_mut(key) {
            list.retain(|(entry_id, _)| *entry_id != id);
            if list.is_empty() {
                entries.remove(key);
            }
        }
    }

    /// Cancel every tracked request for `key`.
    pub fn cancel(&self, key: &str) {
        if let Some(list) = self.entries().remove(key) {
            for (_, token) in list {
                token.cancel();
            }
        }
    }

    /// Cancel everything tracked.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = self.entries().drain().collect();
        for (_, list) in drained {
            for (_, token) in list {
                token.cancel();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_removes_entry_on_drop() {
        let pending = PendingRequests::new();
        {
            let _guard = pending.track("a");
            assert_eq!(pending.len(), 1);
        }
        assert!(pending.is_empty());
    }

    #[test]
    fn cancel_hits_only_that_key() {
        let pending = PendingRequests::new();
        let a = pending.track("a");
        let b = pending.track("b");

        pending.cancel("a");

        assert!(a.token().is_cancelled());
        assert!(!b.token().is_cancelled());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn cancel_all_hits_every_request() {
        let pending = PendingRequests::new();
        let a1 = pending.track("a");
        let a2 = pending.track("a");
        let b = pending.track("b");

        pending.cancel_all();

        assert!(a1.token().is_cancelled());
        assert!(a2.token().is_cancelled());
        assert!(b.token().is_cancelled());
        assert!(pending.is_empty());
    }

    #[test]
    fn dropping_one_guard_keeps_siblings() {
        let pending = PendingRequests::new();
        let first = pending.track("a");
        let second = pending.track("a");
        drop(first);
        assert_eq!(pending.len(), 1);
        pending.cancel("a");
        assert!(second.token().is_cancelled());
    }

    #[test]
    fn cancel_unknown_key_is_noop() {
        let pending = PendingRequests::new();
        pending.cancel("missing");
        pending.cancel_all();
        assert!(pending.is_empty());
    }
}
