//! # Live Subscriptions
//!
//! Push-based snapshots over a broadcast change feed.
//!
//! ```text
//!  writer thread                        subscribers
//!  ┌──────────────┐   ChangeEvent   ┌──────────────────┐
//!  │ commit write ├────broadcast───►│ matching change? │
//!  └──────────────┘                 │   re-read path   │──► fresh Snapshot
//!                                   └──────────────────┘
//! ```
//!
//! A subscription delivers the current snapshot first, then one fresh
//! snapshot per committed write that touches its collection. Because every
//! notification collapses into a single re-read of current state, a lagged
//! receiver loses nothing: it re-reads once and is current again. Dropping
//! the subscription is the unsubscribe; there is no other teardown.
//!
//! Change events are published only after the write is durable; a
//! notification never precedes its data.

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::actor::StoreHandle;
use crate::error::Result;
use crate::store::Snapshot;

/// Default capacity of the change feed. A slow subscriber that falls more
/// than this far behind refreshes once instead of replaying.
pub const DEFAULT_CHANGE_CAPACITY: usize = 1024;

// =============================================================================
// Change Feed
// =============================================================================

/// A committed write, broadcast to subscribers.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Top-level collection the write landed in.
    pub collection: String,
    /// Full path of the written or removed record.
    pub path: String,
}

impl ChangeEvent {
    pub(crate) fn new(collection: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            path: path.into(),
        }
    }
}

/// The broadcast channel change events fan out on.
///
/// Cloned freely: the writer thread publishes, store handles subscribe.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Creates a feed with the given buffered-event capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes a committed write. A feed with no subscribers drops the
    /// event; there is nobody to refresh.
    pub fn publish(&self, event: ChangeEvent) {
        debug!(collection = %event.collection, path = %event.path, "change committed");
        let _ = self.tx.send(event);
    }

    /// Returns a new receiver for the feed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Number of live receivers. Drops as subscriptions are dropped.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// =============================================================================
// Collection Subscriptions
// =============================================================================

/// Store-side equality filter on a child field of each record.
#[derive(Debug, Clone)]
pub struct ChildFilter {
    pub child: String,
    pub equals: Value,
}

/// A live subscription to one collection, optionally filtered.
///
/// The receiver is attached before the first read, so a write landing
/// between construction and the first `next()` produces at worst one
/// redundant refresh, never a missed one.
pub struct CollectionSubscription {
    store: StoreHandle,
    collection: String,
    filter: Option<ChildFilter>,
    rx: broadcast::Receiver<ChangeEvent>,
    delivered_initial: bool,
}

impl CollectionSubscription {
    pub(crate) fn new(
        store: StoreHandle,
        collection: String,
        filter: Option<ChildFilter>,
        rx: broadcast::Receiver<ChangeEvent>,
    ) -> Self {
        Self {
            store,
            collection,
            filter,
            rx,
            delivered_initial: false,
        }
    }

    /// The collection this subscription watches.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Waits for the next snapshot.
    ///
    /// The first call resolves immediately with the current state; later
    /// calls resolve after the next committed write to this collection.
    /// Returns `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<Result<Snapshot>> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.read().await);
        }

        loop {
            match self.rx.recv().await {
                Ok(event) if event.collection == self.collection => {
                    return Some(self.read().await);
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // Snapshots are whole-state: one refresh covers every
                    // missed event.
                    warn!(
                        collection = %self.collection,
                        missed, "subscriber lagged, refreshing snapshot"
                    );
                    return Some(self.read().await);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    async fn read(&self) -> Result<Snapshot> {
        match &self.filter {
            None => self.store.get(self.collection.clone()).await,
            Some(filter) => {
                self.store
                    .query_eq(
                        self.collection.clone(),
                        filter.child.clone(),
                        filter.equals.clone(),
                    )
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_counts_subscribers() {
        let feed = ChangeFeed::new(16);
        assert_eq!(feed.subscriber_count(), 0);

        let rx1 = feed.subscribe();
        let rx2 = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        drop(rx1);
        drop(rx2);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn feed_delivers_events_to_all_subscribers() {
        let feed = ChangeFeed::new(16);
        let mut rx1 = feed.subscribe();
        let mut rx2 = feed.subscribe();

        feed.publish(ChangeEvent::new("reviews", "reviews/k1"));

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.collection, "reviews");
        assert_eq!(e2.path, "reviews/k1");
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let feed = ChangeFeed::new(4);
        feed.publish(ChangeEvent::new("updates", "updates/k1"));
    }
}
