//! Document store contract and live snapshot subscriptions.
//!
//! A store holds one append-only collection per [`CollectionPath`]. Callers
//! append [`NewRecord`]s and subscribe to a [`Subscription`], an async stream
//! that yields the complete ordered [`Snapshot`] on every change until it is
//! cancelled or dropped.

pub mod sqlite;

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{Result, SaathiError};
use crate::record::{NewRecord, Snapshot};

pub use sqlite::SqliteStore;

/// Address of one user's activity collection within an application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    pub app_id: String,
    pub user_id: String,
}

impl CollectionPath {
    pub fn new(app_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            user_id: user_id.into(),
        }
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "artifacts/{}/users/{}/activities",
            self.app_id, self.user_id
        )
    }
}

/// Append-only, per-user document store with live ordered queries.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a record. Returns the store-assigned id once the write is acknowledged.
    async fn append(&self, path: &CollectionPath, record: NewRecord) -> Result<String>;

    /// Open a live query over the collection ordered by timestamp descending.
    ///
    /// The first item is the current snapshot. Each later item is the full
    /// snapshot after a change. Transport failures arrive as
    /// [`SaathiError::Connectivity`] items without ending the stream.
    async fn subscribe(&self, path: &CollectionPath) -> Result<Subscription>;
}

/// A cancellable stream of full ordered snapshots.
///
/// Dropping the subscription releases the store-side listener.
pub struct Subscription {
    inner: ReceiverStream<Result<Snapshot>>,
    pump: Option<AbortHandle>,
}

impl Subscription {
    /// Wrap a receiver fed by a store-side task. The task is aborted on cancel.
    pub fn new(rx: mpsc::Receiver<Result<Snapshot>>, pump: AbortHandle) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            pump: Some(pump),
        }
    }

    /// Wrap a receiver whose sender lifetime is managed elsewhere.
    pub fn from_receiver(rx: mpsc::Receiver<Result<Snapshot>>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            pump: None,
        }
    }

    /// Stop the live query. Items already buffered are discarded.
    pub fn cancel(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.inner.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Stream for Subscription {
    type Item = Result<Snapshot>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

/// Read the current snapshot of a collection once.
pub async fn current_snapshot(store: &dyn DocumentStore, path: &CollectionPath) -> Result<Snapshot> {
    let mut subscription = store.subscribe(path).await?;
    subscription.next().await.unwrap_or_else(|| {
        Err(SaathiError::Connectivity(
            "subscription closed before the first snapshot".into(),
        ))
    })
}
