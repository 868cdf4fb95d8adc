//! Boundary between the engine and the systems it acts on

use crate::document::NavigateKind;
use crate::error::ProviderError;
use async_trait::async_trait;
use hmi_common::value::TagValue;
use tracing::info;

/// Source and sink of tag values for the engine.
///
/// Tag references are the composite `id:name` keys.
#[async_trait]
pub trait TagValueProvider: Send + Sync {
    /// Current value of `tag`, `None` when unknown or unavailable.
    fn get(&self, tag: &str) -> Option<TagValue>;

    /// Write `value` to `tag`. Resolves once the write has been applied or
    /// rejected.
    async fn set(&self, tag: &str, value: TagValue) -> Result<(), ProviderError>;
}

#[async_trait]
impl<T: TagValueProvider + ?Sized> TagValueProvider for std::sync::Arc<T> {
    fn get(&self, tag: &str) -> Option<TagValue> {
        (**self).get(tag)
    }

    async fn set(&self, tag: &str, value: TagValue) -> Result<(), ProviderError> {
        (**self).set(tag, value).await
    }
}

/// Receiver of navigation requests.
pub trait Navigator: Send + Sync {
    /// Request a move to `path`. Must not block.
    fn navigate(&self, path: &str, kind: NavigateKind);
}

/// Navigator that only logs requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, path: &str, kind: NavigateKind) {
        info!(%path, %kind, "🧭 Navigation requested");
    }
}
