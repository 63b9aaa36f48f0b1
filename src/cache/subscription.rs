//! Entry subscriptions.

use futures::Stream;
use tokio::sync::watch;

use super::entry::CacheEntry;
use super::keys::QueryKey;

/// Live view of one cache entry.
///
/// Holding a subscription keeps the entry from being evicted and makes it
/// eligible for automatic refetch on invalidation. Dropping it detaches from
/// any in-flight request without cancelling the request itself.
pub struct Subscription {
    rx: watch::Receiver<CacheEntry>,
}

impl Subscription {
    pub(crate) fn new(rx: watch::Receiver<CacheEntry>) -> Self {
        Self { rx }
    }

    pub fn key(&self) -> QueryKey {
        self.rx.borrow().key.clone()
    }

    pub fn current(&self) -> CacheEntry {
        self.rx.borrow().clone()
    }

    /// Wait for the next update. Returns `None` once the entry is gone.
    pub async fn changed(&mut self) -> Option<CacheEntry> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Stream the current snapshot followed by every update.
    pub fn into_stream(mut self) -> impl Stream<Item = CacheEntry> {
        async_stream::stream! {
            let first = self.rx.borrow_and_update().clone();
            yield first;
            while let Some(entry) = self.changed().await {
                yield entry;
            }
        }
    }
}
