//! `DocumentStore` backed by a SQL database through sea-orm.
//!
//! Writes made through a store are broadcast to its subscribers right away.
//! With a poll interval, subscriptions also notice writes made by other
//! processes sharing the database.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use engine::InviteCode;
use sea_orm::{
    ActiveValue, DatabaseConnection, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    CloudError, CollectionPath, Document, DocumentStore, ResultCloud, Snapshot, Subscription,
    TripDocument, documents::RemoteTripConfig,
};

pub mod trip_documents;
pub mod trips;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct SqlDocumentStore {
    database: DatabaseConnection,
    changes: broadcast::Sender<Snapshot>,
    poll_interval: Option<Duration>,
}

impl SqlDocumentStore {
    /// Return a builder for `SqlDocumentStore`.
    pub fn builder() -> SqlDocumentStoreBuilder {
        SqlDocumentStoreBuilder::default()
    }

    /// Broadcast the current content of `path` to the subscribers, if any.
    async fn notify(&self, path: &CollectionPath) {
        if self.changes.receiver_count() == 0 {
            return;
        }
        match self.read_all(path).await {
            Ok(documents) => {
                let _ = self.changes.send(Snapshot {
                    path: path.clone(),
                    documents,
                });
            }
            Err(err) => warn!(%path, %err, "cannot read collection after write"),
        }
    }

    fn spawn_poller(
        &self,
        path: CollectionPath,
        mut last: Vec<Document>,
        every: Duration,
    ) -> CancellationToken {
        let token = CancellationToken::new();
        let stop = token.clone();
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let documents = match store.read_all(&path).await {
                    Ok(documents) => documents,
                    Err(err) => {
                        warn!(%path, %err, "poll failed");
                        continue;
                    }
                };
                if documents != last {
                    debug!(%path, documents = documents.len(), "collection changed");
                    last = documents.clone();
                    let _ = store.changes.send(Snapshot {
                        path: path.clone(),
                        documents,
                    });
                }
            }
        });
        token
    }
}

fn document_from_model(model: trip_documents::Model) -> ResultCloud<Document> {
    let body = serde_json::from_str(&model.body).map_err(|err| CloudError::Malformed {
        key: model.doc_key.clone(),
        reason: err.to_string(),
    })?;
    Ok(Document {
        key: model.doc_key,
        body,
    })
}

fn trip_from_model(model: trips::Model) -> ResultCloud<TripDocument> {
    let config: RemoteTripConfig =
        serde_json::from_str(&model.config).map_err(|err| CloudError::Malformed {
            key: model.id.clone(),
            reason: err.to_string(),
        })?;
    let invite_code: InviteCode = model.invite_code.parse()?;
    Ok(TripDocument {
        title: model.title,
        destination: model.destination,
        start_date: model.start_date,
        days_count: u32::try_from(model.days_count).unwrap_or(0),
        invite_code,
        participants: model.participants,
        config,
    })
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn read_all(&self, path: &CollectionPath) -> ResultCloud<Vec<Document>> {
        trip_documents::Entity::find()
            .filter(trip_documents::Column::TripId.eq(path.trip_id.as_str()))
            .filter(trip_documents::Column::Collection.eq(path.kind.as_str()))
            .order_by_asc(trip_documents::Column::CreatedAt)
            .order_by_asc(trip_documents::Column::DocKey)
            .all(&self.database)
            .await?
            .into_iter()
            .map(document_from_model)
            .collect()
    }

    async fn upsert(&self, path: &CollectionPath, document: Document) -> ResultCloud<()> {
        let body = serde_json::to_string(&document.body)?;
        let db_tx = self.database.begin().await?;
        let existing = trip_documents::Entity::find_by_id((
            path.trip_id.clone(),
            path.kind.as_str().to_string(),
            document.key.clone(),
        ))
        .one(&db_tx)
        .await?;

        match existing {
            Some(model) => {
                let mut active: trip_documents::ActiveModel = model.into();
                active.body = ActiveValue::Set(body);
                active.update(&db_tx).await?;
            }
            None => {
                let active = trip_documents::ActiveModel {
                    trip_id: ActiveValue::Set(path.trip_id.clone()),
                    collection: ActiveValue::Set(path.kind.as_str().to_string()),
                    doc_key: ActiveValue::Set(document.key),
                    body: ActiveValue::Set(body),
                    created_at: ActiveValue::Set(Utc::now()),
                };
                active.insert(&db_tx).await?;
            }
        }
        db_tx.commit().await?;

        self.notify(path).await;
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, key: &str) -> ResultCloud<bool> {
        let result = trip_documents::Entity::delete_by_id((
            path.trip_id.clone(),
            path.kind.as_str().to_string(),
            key.to_string(),
        ))
        .exec(&self.database)
        .await?;
        if result.rows_affected == 0 {
            return Ok(false);
        }

        self.notify(path).await;
        Ok(true)
    }

    async fn delete_all(&self, path: &CollectionPath) -> ResultCloud<u64> {
        let result = trip_documents::Entity::delete_many()
            .filter(trip_documents::Column::TripId.eq(path.trip_id.as_str()))
            .filter(trip_documents::Column::Collection.eq(path.kind.as_str()))
            .exec(&self.database)
            .await?;
        if result.rows_affected > 0 {
            self.notify(path).await;
        }
        Ok(result.rows_affected)
    }

    async fn subscribe(&self, path: &CollectionPath) -> ResultCloud<Subscription> {
        // Subscribe first so no write between the read and the subscription
        // goes unnoticed.
        let receiver = self.changes.subscribe();
        let documents = self.read_all(path).await?;
        let poller = self
            .poll_interval
            .map(|every| self.spawn_poller(path.clone(), documents.clone(), every).drop_guard());
        let initial = Snapshot {
            path: path.clone(),
            documents,
        };
        Ok(Subscription::new(path.clone(), initial, receiver, poller))
    }

    async fn put_trip(&self, trip_id: &str, trip: &TripDocument) -> ResultCloud<()> {
        let config = serde_json::to_string(&trip.config)?;
        let days_count = i32::try_from(trip.days_count).unwrap_or(i32::MAX);
        let now = Utc::now();
        let db_tx = self.database.begin().await?;
        let existing = trips::Entity::find_by_id(trip_id.to_string())
            .one(&db_tx)
            .await?;

        let mut active = trips::ActiveModel {
            id: ActiveValue::Set(trip_id.to_string()),
            invite_code: ActiveValue::Set(trip.invite_code.to_string()),
            title: ActiveValue::Set(trip.title.clone()),
            destination: ActiveValue::Set(trip.destination.clone()),
            start_date: ActiveValue::Set(trip.start_date.clone()),
            days_count: ActiveValue::Set(days_count),
            participants: ActiveValue::Set(trip.participants.clone()),
            config: ActiveValue::Set(config),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        if existing.is_some() {
            active.created_at = ActiveValue::NotSet;
            active.update(&db_tx).await?;
        } else {
            active.insert(&db_tx).await?;
        }
        db_tx.commit().await?;
        Ok(())
    }

    async fn get_trip(&self, trip_id: &str) -> ResultCloud<Option<TripDocument>> {
        trips::Entity::find_by_id(trip_id.to_string())
            .one(&self.database)
            .await?
            .map(trip_from_model)
            .transpose()
    }

    async fn find_trip_by_invite_code(
        &self,
        code: &InviteCode,
    ) -> ResultCloud<Option<(String, TripDocument)>> {
        let Some(model) = trips::Entity::find()
            .filter(trips::Column::InviteCode.eq(code.as_str()))
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        let id = model.id.clone();
        Ok(Some((id, trip_from_model(model)?)))
    }
}

/// The builder for `SqlDocumentStore`
#[derive(Default)]
pub struct SqlDocumentStoreBuilder {
    database: DatabaseConnection,
    poll_interval: Option<Duration>,
    channel_capacity: Option<usize>,
}

impl SqlDocumentStoreBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> SqlDocumentStoreBuilder {
        self.database = db;
        self
    }

    /// Re-read watched collections this often to pick up foreign writes.
    pub fn poll_interval(mut self, every: Option<Duration>) -> SqlDocumentStoreBuilder {
        self.poll_interval = every.filter(|every| !every.is_zero());
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> SqlDocumentStoreBuilder {
        self.channel_capacity = Some(capacity.max(1));
        self
    }

    /// Construct `SqlDocumentStore`, checking the database answers.
    pub async fn build(self) -> ResultCloud<SqlDocumentStore> {
        self.database
            .ping()
            .await
            .map_err(|err| CloudError::Unavailable(err.to_string()))?;
        let (changes, _) =
            broadcast::channel(self.channel_capacity.unwrap_or(DEFAULT_CHANNEL_CAPACITY));
        Ok(SqlDocumentStore {
            database: self.database,
            changes,
            poll_interval: self.poll_interval,
        })
    }
}
