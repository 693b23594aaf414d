//! Outstanding request handles, at most one per source key.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

/// Cancellable reference to one dispatched request.
///
/// Cancelling is idempotent and safe after the request already finished.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: u64,
    token: CancellationToken,
}

impl RequestHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Default)]
pub struct InFlightRegistry {
    handles: HashMap<String, RequestHandle>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `handle` for `key`.  A previous handle is replaced, not cancelled.
    pub fn register(&mut self, key: &str, handle: RequestHandle) {
        self.handles.insert(key.to_string(), handle);
    }

    /// Cancel and forget the handle for `key`.  Returns whether one existed.
    pub fn cancel(&mut self, key: &str) -> bool {
        match self.handles.remove(key) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel and forget every handle.  Returns the keys that were cancelled.
    pub fn cancel_all(&mut self) -> Vec<String> {
        self.handles
            .drain()
            .map(|(key, handle)| {
                handle.cancel();
                key
            })
            .collect()
    }

    /// Forget the handle for `key` without cancelling it.
    pub fn remove(&mut self, key: &str) -> Option<RequestHandle> {
        self.handles.remove(key)
    }

    /// Forget the handle for `key` only if it is the request `id`.
    ///
    /// A late completion from a superseded request must not evict the
    /// handle of the request that replaced it.
    pub fn remove_if(&mut self, key: &str, id: u64) -> bool {
        if self.handles.get(key).is_some_and(|h| h.id == id) {
            self.remove(key);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handles.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&RequestHandle> {
        self.handles.get(key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_cancels_and_removes() {
        let mut inflight = InFlightRegistry::new();
        let handle = RequestHandle::new(1);
        inflight.register("a", handle.clone());

        assert!(inflight.cancel("a"));
        assert!(handle.is_cancelled());
        assert!(!inflight.contains("a"));
    }

    #[test]
    fn cancel_absent_is_noop() {
        let mut inflight = InFlightRegistry::new();
        assert!(!inflight.cancel("a"));
        assert!(inflight.cancel_all().is_empty());
    }

    #[test]
    fn register_overwrites_without_cancelling() {
        let mut inflight = InFlightRegistry::new();
        let first = RequestHandle::new(1);
        inflight.register("a", first.clone());
        inflight.register("a", RequestHandle::new(2));

        assert!(!first.is_cancelled());
        assert_eq!(inflight.get("a").map(RequestHandle::id), Some(2));
        assert_eq!(inflight.len(), 1);
    }

    #[test]
    fn remove_does_not_cancel() {
        let mut inflight = InFlightRegistry::new();
        let handle = RequestHandle::new(1);
        inflight.register("a", handle.clone());

        assert!(inflight.remove("a").is_some());
        assert!(!handle.is_cancelled());
        assert!(inflight.is_empty());
    }

    #[test]
    fn remove_if_only_matches_same_request() {
        let mut inflight = InFlightRegistry::new();
        inflight.register("a", RequestHandle::new(2));

        assert!(!inflight.remove_if("a", 1));
        assert!(inflight.contains("a"));
        assert!(inflight.remove_if("a", 2));
        assert!(!inflight.contains("a"));
    }

    #[test]
    fn cancel_all_drains_everything() {
        let mut inflight = InFlightRegistry::new();
        let a = RequestHandle::new(1);
        let b = RequestHandle::new(2);
        inflight.register("a", a.clone());
        inflight.register("b", b.clone());

        let mut keys = inflight.cancel_all();
        keys.sort();

        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        assert!(a.is_cancelled() && b.is_cancelled());
        assert!(inflight.is_empty());
    }

    #[test]
    fn cancelling_twice_is_safe() {
        let handle = RequestHandle::new(1);
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }
}
