//! The set of configured sources and their active flags.
//!
//! `SourceRegistry` is cheap to clone; clones share state.  Change callbacks
//! fire once per real active/inactive transition, after the registry lock is
//! released, so a callback may read the registry.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::{debug, info};

use super::Source;

type ChangeCallback = Arc<dyn Fn(&Source) + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("source keys must not be empty")]
    EmptyKey,
    #[error("a source with key `{0}` already exists")]
    DuplicateKey(String),
    #[error("no source with key `{0}`")]
    UnknownKey(String),
}

#[derive(Default)]
struct Inner {
    sources: Vec<Source>,
    callbacks: Vec<ChangeCallback>,
}

#[derive(Clone, Default)]
pub struct SourceRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `sources`, rejecting duplicate keys.
    pub fn with_sources(sources: impl IntoIterator<Item = Source>) -> Result<Self, RegistryError> {
        let registry = Self::new();
        for source in sources {
            registry.add(source)?;
        }
        Ok(registry)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every known source, in insertion order.
    pub fn filters(&self) -> Vec<Source> {
        self.read().sources.clone()
    }

    pub fn get(&self, key: &str) -> Option<Source> {
        self.read().sources.iter().find(|s| s.key == key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn register_change_callback(&self, callback: impl Fn(&Source) + Send + Sync + 'static) {
        self.write().callbacks.push(Arc::new(callback));
    }

    /// Add a source.  An active source fires the change callbacks, since it
    /// just became active as far as any listener is concerned.
    ///
    /// Keys end up as the origin of every item, so a blank key is rejected.
    pub fn add(&self, source: Source) -> Result<(), RegistryError> {
        if source.key.trim().is_empty() {
            return Err(RegistryError::EmptyKey);
        }
        let callbacks = {
            let mut inner = self.write();
            if inner.sources.iter().any(|s| s.key == source.key) {
                return Err(RegistryError::DuplicateKey(source.key));
            }
            info!(key = %source.key, active = source.active, "source added");
            inner.sources.push(source.clone());
            if source.active {
                inner.callbacks.clone()
            } else {
                Vec::new()
            }
        };
        notify(&callbacks, &source);
        Ok(())
    }

    /// Remove a source.  An active source is deactivated first.
    pub fn remove(&self, key: &str) -> Result<Source, RegistryError> {
        self.set_active(key, false)?;
        let mut inner = self.write();
        let index = inner
            .sources
            .iter()
            .position(|s| s.key == key)
            .ok_or_else(|| RegistryError::UnknownKey(key.to_string()))?;
        info!(key, "source removed");
        Ok(inner.sources.remove(index))
    }

    /// Set the active flag.  Returns whether it changed.
    pub fn set_active(&self, key: &str, active: bool) -> Result<bool, RegistryError> {
        let (changed, callbacks) = {
            let mut inner = self.write();
            let source = inner
                .sources
                .iter_mut()
                .find(|s| s.key == key)
                .ok_or_else(|| RegistryError::UnknownKey(key.to_string()))?;
            if source.active == active {
                return Ok(false);
            }
            source.active = active;
            debug!(key, active, "source toggled");
            (source.clone(), inner.callbacks.clone())
        };
        notify(&callbacks, &changed);
        Ok(true)
    }

    /// Flip the active flag and return the new value.
    pub fn toggle(&self, key: &str) -> Result<bool, RegistryError> {
        let current = self
            .get(key)
            .ok_or_else(|| RegistryError::UnknownKey(key.to_string()))?;
        self.set_active(key, !current.active)?;
        Ok(!current.active)
    }
}

fn notify(callbacks: &[ChangeCallback], source: &Source) {
    for callback in callbacks {
        callback(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceKind;
    use std::sync::Mutex;

    fn registry_with_two() -> SourceRegistry {
        SourceRegistry::with_sources([
            Source::from_kind(SourceKind::DesignerNewsPopular, true),
            Source::from_kind(SourceKind::ProductHunt, false),
        ])
        .unwrap()
    }

    fn record(registry: &SourceRegistry) -> Arc<Mutex<Vec<(String, bool)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.register_change_callback(move |source| {
            sink.lock().unwrap().push((source.key.clone(), source.active));
        });
        seen
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let registry = registry_with_two();
        let err = registry
            .add(Source::from_kind(SourceKind::ProductHunt, true))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateKey("product-hunt".into()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn blank_keys_are_rejected() {
        let registry = registry_with_two();
        for key in ["", "   "] {
            let mut source = Source::from_kind(
                SourceKind::DribbbleSearch {
                    query: "icons".into(),
                },
                true,
            );
            source.key = key.to_string();
            assert_eq!(registry.add(source), Err(RegistryError::EmptyKey));
        }
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn callback_fires_once_per_transition() {
        let registry = registry_with_two();
        let seen = record(&registry);

        assert!(registry.set_active("product-hunt", true).unwrap());
        assert!(!registry.set_active("product-hunt", true).unwrap());
        assert!(!registry.toggle("designer-news-popular").unwrap());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ("product-hunt".to_string(), true),
                ("designer-news-popular".to_string(), false),
            ]
        );
    }

    #[test]
    fn removing_active_source_deactivates_it_first() {
        let registry = registry_with_two();
        let seen = record(&registry);

        let removed = registry.remove("designer-news-popular").unwrap();
        assert!(!removed.active);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("designer-news-popular".to_string(), false)]
        );
        assert!(registry.get("designer-news-popular").is_none());
    }

    #[test]
    fn adding_active_source_notifies() {
        let registry = registry_with_two();
        let seen = record(&registry);

        registry
            .add(Source::from_kind(
                SourceKind::DribbbleSearch {
                    query: "icons".into(),
                },
                true,
            ))
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn unknown_key_errors() {
        let registry = registry_with_two();
        assert_eq!(
            registry.toggle("nope"),
            Err(RegistryError::UnknownKey("nope".into()))
        );
    }

    #[test]
    fn clones_share_state() {
        let registry = registry_with_two();
        let other = registry.clone();
        other.set_active("product-hunt", true).unwrap();
        assert!(registry.get("product-hunt").unwrap().active);
    }
}
