//! Provider implementations
//!
//! - [`StoreProvider`]: reads and writes the tag store directly
//! - [`OptimisticProvider`]: applies writes to a local view first and
//!   reverts them when the inner provider rejects the write

use crate::error::ProviderError;
use crate::provider::TagValueProvider;
use async_trait::async_trait;
use hmi_common::value::TagValue;
use hmi_shared_memory::{SharedVariableStore, ShmError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

// ─── Store ──────────────────────────────────────────────────────────

/// Provider backed by a [`SharedVariableStore`].
///
/// Writes run on the blocking pool since slot locks spin. Intended for a
/// store in write-through mode; in local-cache mode writes stay local until
/// the owner flushes.
#[derive(Debug, Clone)]
pub struct StoreProvider {
    store: Arc<SharedVariableStore>,
}

impl StoreProvider {
    /// Wrap a shared store.
    pub fn new(store: Arc<SharedVariableStore>) -> Self {
        Self { store }
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<SharedVariableStore> {
        &self.store
    }
}

fn store_error(tag: &str, error: ShmError) -> ProviderError {
    match error {
        ShmError::UnknownTag { .. } => ProviderError::UnknownTag {
            tag: tag.to_string(),
        },
        other => ProviderError::Store { source: other },
    }
}

#[async_trait]
impl TagValueProvider for StoreProvider {
    fn get(&self, tag: &str) -> Option<TagValue> {
        match self.store.get(tag) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(%tag, error = %e, "Tag read failed");
                None
            }
        }
    }

    async fn set(&self, tag: &str, value: TagValue) -> Result<(), ProviderError> {
        let store = Arc::clone(&self.store);
        let key = tag.to_string();
        tokio::task::spawn_blocking(move || store.set(&key, &value))
            .await
            .map_err(|e| ProviderError::Task(e.to_string()))?
            .map_err(|e| store_error(tag, e))
    }
}

// ─── Optimistic ─────────────────────────────────────────────────────

/// Notified when a tentative write is reverted.
pub trait RollbackObserver: Send + Sync {
    /// `attempted` was written to `tag` and reverted after `error`.
    fn rolled_back(&self, tag: &str, attempted: &TagValue, error: &ProviderError);
}

/// Observer that logs rollbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRollback;

impl RollbackObserver for LogRollback {
    fn rolled_back(&self, tag: &str, attempted: &TagValue, error: &ProviderError) {
        warn!(%tag, %attempted, %error, "↩️ Write failed, local value reverted");
    }
}

/// View entry stamped with the write that produced it.
#[derive(Debug, Clone)]
struct Tracked {
    value: TagValue,
    generation: u64,
}

#[derive(Debug, Default)]
struct View {
    entries: HashMap<String, Tracked>,
    next_generation: u64,
}

impl View {
    fn apply(&mut self, tag: &str, value: TagValue) -> (u64, Option<Tracked>) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let previous = self
            .entries
            .insert(tag.to_string(), Tracked { value, generation });
        (generation, previous)
    }
}

/// Tentative-apply wrapper around another provider.
///
/// Reads are served from a local view (falling back to the inner provider
/// for tags not seen yet). `set` updates the view immediately, then awaits
/// the inner write; on failure the previous value is restored (or removed if
/// there was none) and the observer is notified. A failed write is not
/// reverted once a later write or refresh has replaced its entry.
pub struct OptimisticProvider<P> {
    inner: P,
    view: RwLock<View>,
    observer: Arc<dyn RollbackObserver>,
}

impl<P: TagValueProvider> OptimisticProvider<P> {
    /// Wrap `inner` with the logging observer.
    pub fn new(inner: P) -> Self {
        Self::with_observer(inner, Arc::new(LogRollback))
    }

    /// Wrap `inner` with a custom observer.
    pub fn with_observer(inner: P, observer: Arc<dyn RollbackObserver>) -> Self {
        Self {
            inner,
            view: RwLock::new(View::default()),
            observer,
        }
    }

    /// Merge polled values into the local view.
    pub fn refresh<I>(&self, values: I)
    where
        I: IntoIterator<Item = (String, TagValue)>,
    {
        let mut view = self.view.write();
        for (tag, value) in values {
            view.apply(&tag, value);
        }
    }

    /// Value currently held in the local view.
    pub fn local(&self, tag: &str) -> Option<TagValue> {
        self.view
            .read()
            .entries
            .get(tag)
            .map(|entry| entry.value.clone())
    }

    /// Inner provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: TagValueProvider> TagValueProvider for OptimisticProvider<P> {
    fn get(&self, tag: &str) -> Option<TagValue> {
        self.local(tag).or_else(|| self.inner.get(tag))
    }

    async fn set(&self, tag: &str, value: TagValue) -> Result<(), ProviderError> {
        let (generation, previous) = self.view.write().apply(tag, value.clone());

        let result = self.inner.set(tag, value.clone()).await;
        if let Err(error) = &result {
            let reverted = {
                let mut view = self.view.write();
                let current = view.entries.get(tag).map(|entry| entry.generation);
                if current == Some(generation) {
                    match previous {
                        Some(old) => view.entries.insert(tag.to_string(), old),
                        None => view.entries.remove(tag),
                    };
                    true
                } else {
                    false
                }
            };
            if reverted {
                self.observer.rolled_back(tag, &value, error);
            } else {
                debug!(%tag, %error, "Write failed after a newer write, view kept");
            }
        }
        result
    }
}
