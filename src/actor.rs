//! # Store Thread and Async Handle
//!
//! The record store engine owns a SQLite connection, which must not be shared
//! across threads. One dedicated OS thread owns the engine; async callers
//! reach it over channels.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      async tasks                         │
//! │   handle.get() ─┐                         ┌─ handle.push │
//! │   handle.put() ─┼── mpsc::Sender ─────────┼─ handle.…    │
//! └─────────────────┼─────────────────────────┼──────────────┘
//!                   │ StoreRequest + oneshot  │
//!                   ▼                         ▼
//!        ┌─────────────────────────────────────────┐
//!        │        dedicated thread (1 writer)      │
//!        │  RecordStore ── SQLite (WAL)            │
//!        │  owns the change feed                   │
//!        │  commit, respond, then publish change   │
//!        └─────────────────────────────────────────┘
//! ```
//!
//! Single logical writer: the thread is the only code that ever touches the
//! connection, so writes serialize without locks. Callers never block; each
//! request resolves through its own oneshot channel.
//!
//! The change feed lives on the thread, and receivers are handed out through
//! a [`StoreRequest::Subscribe`] round trip. When the thread exits, the feed
//! drops with it and every live subscription observes the close; handles
//! keep no sender that could hold a dead store's feed open.
//!
//! [`StoreHandle`] is `Clone` + `Send` + `Sync`; every clone talks to the
//! same thread. When the last handle drops, the request channel closes and
//! the thread exits on its own; [`StoreHandle::shutdown`] does the same
//! thing deterministically and joins.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::info;

use crate::error::{Error, Result};
use crate::schema::Database;
use crate::store::{RecordStore, Snapshot};
use crate::subscription::{
    ChangeEvent, ChangeFeed, ChildFilter, CollectionSubscription, DEFAULT_CHANGE_CAPACITY,
};
use crate::types::RecordKey;

/// Maximum number of requests waiting for the store thread.
const REQUEST_CHANNEL_BOUND: usize = 1024;

/// Requests handled by the store thread. Each variant carries its own
/// response channel.
pub enum StoreRequest {
    Get {
        path: String,
        respond: oneshot::Sender<Result<Snapshot>>,
    },
    Put {
        path: String,
        value: Value,
        respond: oneshot::Sender<Result<()>>,
    },
    Push {
        collection: String,
        value: Value,
        respond: oneshot::Sender<Result<RecordKey>>,
    },
    Remove {
        path: String,
        respond: oneshot::Sender<Result<()>>,
    },
    QueryEq {
        collection: String,
        child: String,
        equals: Value,
        respond: oneshot::Sender<Result<Snapshot>>,
    },
    /// Hands out a receiver on the thread-owned change feed.
    Subscribe {
        respond: oneshot::Sender<broadcast::Receiver<ChangeEvent>>,
    },
    /// Number of live change-feed receivers.
    SubscriberCount {
        respond: oneshot::Sender<usize>,
    },
    Shutdown,
}

/// Spawns the store thread and returns the shared async handle.
pub fn spawn_store(db: Database) -> StoreHandle {
    spawn_store_with_capacity(db, DEFAULT_CHANGE_CAPACITY)
}

/// [`spawn_store`] with an explicit change-feed capacity.
pub fn spawn_store_with_capacity(db: Database, change_capacity: usize) -> StoreHandle {
    let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_BOUND);

    let worker = thread::Builder::new()
        .name("classboard-store".to_string())
        .spawn(move || {
            run_store(
                RecordStore::new(db),
                rx,
                ChangeFeed::new(change_capacity),
            )
        })
        .expect("failed to spawn store thread");

    StoreHandle {
        tx,
        worker: Arc::new(Mutex::new(Some(worker))),
    }
}

/// The store thread's main loop: execute, respond, then notify.
fn run_store(mut store: RecordStore, mut rx: mpsc::Receiver<StoreRequest>, feed: ChangeFeed) {
    info!("record store thread started");

    while let Some(request) = rx.blocking_recv() {
        match request {
            StoreRequest::Get { path, respond } => {
                let _ = respond.send(store.get(&path));
            }
            StoreRequest::Put {
                path,
                value,
                respond,
            } => {
                let result = store.put(&path, &value);
                let committed = result.is_ok();
                let _ = respond.send(result);
                if committed {
                    feed.publish(change_for(&path));
                }
            }
            StoreRequest::Push {
                collection,
                value,
                respond,
            } => {
                let result = store.push(&collection, &value);
                let committed_key = result.as_ref().ok().cloned();
                let _ = respond.send(result);
                if let Some(key) = committed_key {
                    feed.publish(ChangeEvent::new(
                        collection.clone(),
                        format!("{collection}/{key}"),
                    ));
                }
            }
            StoreRequest::Remove { path, respond } => {
                let result = store.remove(&path);
                let committed = result.is_ok();
                let _ = respond.send(result);
                if committed {
                    feed.publish(change_for(&path));
                }
            }
            StoreRequest::QueryEq {
                collection,
                child,
                equals,
                respond,
            } => {
                let _ = respond.send(store.query_eq(&collection, &child, &equals));
            }
            StoreRequest::Subscribe { respond } => {
                let _ = respond.send(feed.subscribe());
            }
            StoreRequest::SubscriberCount { respond } => {
                let _ = respond.send(feed.subscriber_count());
            }
            StoreRequest::Shutdown => break,
        }
    }

    // Dropping the feed here closes every live subscription.
    info!("record store thread stopped");
}

/// Change event for a write at `path`; the collection is its first segment.
/// Only called for paths the engine already validated.
fn change_for(path: &str) -> ChangeEvent {
    let collection = path.split('/').next().unwrap_or(path);
    ChangeEvent::new(collection, path)
}

/// Cloneable async handle to the record store.
#[derive(Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreRequest>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl StoreHandle {
    /// Reads the record or collection at `path`.
    pub async fn get(&self, path: impl Into<String>) -> Result<Snapshot> {
        let path = path.into();
        self.request(|respond| StoreRequest::Get { path, respond })
            .await
    }

    /// Writes `value` at a `collection/key` path.
    pub async fn put(&self, path: impl Into<String>, value: Value) -> Result<()> {
        let path = path.into();
        self.request(|respond| StoreRequest::Put {
            path,
            value,
            respond,
        })
        .await
    }

    /// Appends `value` to `collection` under an auto-generated key.
    pub async fn push(&self, collection: impl Into<String>, value: Value) -> Result<RecordKey> {
        let collection = collection.into();
        self.request(|respond| StoreRequest::Push {
            collection,
            value,
            respond,
        })
        .await
    }

    /// Deletes a record, or a whole collection for a one-segment path.
    pub async fn remove(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.request(|respond| StoreRequest::Remove { path, respond })
            .await
    }

    /// Children of `collection` whose `child` field equals `equals`.
    pub async fn query_eq(
        &self,
        collection: impl Into<String>,
        child: impl Into<String>,
        equals: Value,
    ) -> Result<Snapshot> {
        let collection = collection.into();
        let child = child.into();
        self.request(|respond| StoreRequest::QueryEq {
            collection,
            child,
            equals,
            respond,
        })
        .await
    }

    /// Opens a live subscription to a collection.
    pub async fn watch(&self, collection: impl Into<String>) -> Result<CollectionSubscription> {
        let rx = self
            .request_infallible(|respond| StoreRequest::Subscribe { respond })
            .await?;
        Ok(CollectionSubscription::new(
            self.clone(),
            collection.into(),
            None,
            rx,
        ))
    }

    /// Opens a live subscription filtered store-side on a child field.
    pub async fn watch_eq(
        &self,
        collection: impl Into<String>,
        child: impl Into<String>,
        equals: Value,
    ) -> Result<CollectionSubscription> {
        let rx = self
            .request_infallible(|respond| StoreRequest::Subscribe { respond })
            .await?;
        Ok(CollectionSubscription::new(
            self.clone(),
            collection.into(),
            Some(ChildFilter {
                child: child.into(),
                equals,
            }),
            rx,
        ))
    }

    /// Number of live subscriptions on the change feed.
    pub async fn subscriber_count(&self) -> Result<usize> {
        self.request_infallible(|respond| StoreRequest::SubscriberCount { respond })
            .await
    }

    /// Stops the store thread and waits for it to finish. Requests issued
    /// after this resolve to [`Error::Unavailable`]; live subscriptions end.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(StoreRequest::Shutdown).await;
        let worker = self.worker.lock().expect("worker mutex poisoned").take();
        if let Some(handle) = worker {
            let _ = handle.join();
        }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> StoreRequest,
    ) -> Result<T> {
        self.request_infallible(make).await?
    }

    /// Round trip for requests whose response is not itself a `Result`.
    async fn request_infallible<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> StoreRequest,
    ) -> Result<T> {
        let (respond, response) = oneshot::channel();
        self.tx.send(make(respond)).await.map_err(|_| Error::Unavailable {
            service: "record store",
        })?;
        response.await.map_err(|_| Error::Unavailable {
            service: "record store",
        })
    }
}
