//! The remote document store seen by the sync layer.

use async_trait::async_trait;
use engine::{Expense, InviteCode};
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tokio_util::sync::DropGuard;
use tracing::debug;

use crate::{
    CollectionPath, Document, ResultCloud, TripDocument,
    documents::{decode_days, decode_expenses},
};

/// Full content of one collection at some point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub path: CollectionPath,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn expenses(&self) -> ResultCloud<Vec<Expense>> {
        decode_expenses(&self.documents)
    }
}

/// A collection-oriented document store.
///
/// Every write to a collection eventually produces a [`Snapshot`] on the
/// subscriptions opened for it, including writes made through the same
/// store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of the collection, empty when it has none.
    async fn read_all(&self, path: &CollectionPath) -> ResultCloud<Vec<Document>>;

    /// Create or replace the document with `document.key`.
    async fn upsert(&self, path: &CollectionPath, document: Document) -> ResultCloud<()>;

    /// Delete a document. `false` when there was nothing to delete.
    async fn delete(&self, path: &CollectionPath, key: &str) -> ResultCloud<bool>;

    /// Delete every document of the collection, returning how many went.
    async fn delete_all(&self, path: &CollectionPath) -> ResultCloud<u64>;

    /// Watch a collection. The first snapshot is the current content.
    async fn subscribe(&self, path: &CollectionPath) -> ResultCloud<Subscription>;

    /// Create or replace the trip document `trip_id`.
    async fn put_trip(&self, trip_id: &str, trip: &TripDocument) -> ResultCloud<()>;

    async fn get_trip(&self, trip_id: &str) -> ResultCloud<Option<TripDocument>>;

    /// The id and document of the trip using `code`, if any.
    async fn find_trip_by_invite_code(
        &self,
        code: &InviteCode,
    ) -> ResultCloud<Option<(String, TripDocument)>>;
}

/// Shared-expense records of a remote trip.
pub async fn read_expenses(
    store: &dyn DocumentStore,
    path: &CollectionPath,
) -> ResultCloud<Vec<Expense>> {
    let documents = store.read_all(path).await?;
    decode_expenses(&documents)
}

pub async fn read_days(
    store: &dyn DocumentStore,
    path: &CollectionPath,
) -> ResultCloud<Vec<engine::Day>> {
    let documents = store.read_all(path).await?;
    decode_days(&documents)
}

/// Stream of snapshots for one collection.
///
/// Dropping the subscription unsubscribes; any background poller started for
/// it stops with it.
pub struct Subscription {
    path: CollectionPath,
    initial: Option<Snapshot>,
    receiver: broadcast::Receiver<Snapshot>,
    _poller: Option<DropGuard>,
}

impl Subscription {
    pub fn new(
        path: CollectionPath,
        initial: Snapshot,
        receiver: broadcast::Receiver<Snapshot>,
        poller: Option<DropGuard>,
    ) -> Self {
        Self {
            path,
            initial: Some(initial),
            receiver,
            _poller: poller,
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Wait for the next snapshot of the watched collection.
    ///
    /// Snapshots already queued behind it are skipped in favour of the most
    /// recent one. `None` once the store is gone.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            let snapshot = match self.receiver.recv().await {
                Ok(snapshot) => snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(path = %self.path, skipped, "subscription lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            };
            if snapshot.path != self.path {
                continue;
            }
            return Some(self.drain(snapshot));
        }
    }

    fn drain(&mut self, mut latest: Snapshot) -> Snapshot {
        loop {
            match self.receiver.try_recv() {
                Ok(snapshot) if snapshot.path == self.path => latest = snapshot,
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return latest,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn snapshot(trip: &str, key: &str) -> Snapshot {
        Snapshot {
            path: CollectionPath::shared_expenses(trip),
            documents: vec![Document {
                key: key.to_string(),
                body: json!({}),
            }],
        }
    }

    #[tokio::test]
    async fn yields_initial_then_latest_of_queue() {
        let (sender, receiver) = broadcast::channel(16);
        let path = CollectionPath::shared_expenses("t1");
        let mut subscription = Subscription::new(path, snapshot("t1", "initial"), receiver, None);

        sender.send(snapshot("t1", "first")).unwrap();
        sender.send(snapshot("other", "foreign")).unwrap();
        sender.send(snapshot("t1", "second")).unwrap();

        let initial = subscription.next().await.unwrap();
        assert_eq!(initial.documents[0].key, "initial");
        let next = subscription.next().await.unwrap();
        assert_eq!(next.documents[0].key, "second");
    }

    #[tokio::test]
    async fn ends_when_store_is_gone() {
        let (sender, receiver) = broadcast::channel(4);
        let path = CollectionPath::shared_expenses("t1");
        let mut subscription = Subscription::new(path, snapshot("t1", "initial"), receiver, None);
        drop(sender);

        assert!(subscription.next().await.is_some());
        assert!(subscription.next().await.is_none());
    }
}
