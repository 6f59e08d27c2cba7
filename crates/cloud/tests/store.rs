use std::time::Duration;

use cloud::{
    CollectionPath, Document, DocumentStore, RemoteTripConfig, SqlDocumentStore, TripDocument,
};
use engine::InviteCode;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use serde_json::json;

async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

async fn store_with_db() -> (SqlDocumentStore, DatabaseConnection) {
    let db = database().await;
    let store = SqlDocumentStore::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (store, db)
}

fn trip_document(code: &str) -> TripDocument {
    TripDocument {
        title: "Osaka".to_string(),
        destination: "Osaka".to_string(),
        start_date: "2026-03-29".to_string(),
        days_count: 3,
        invite_code: code.parse().unwrap(),
        participants: "A, B".to_string(),
        config: RemoteTripConfig {
            currency: "JPY".to_string(),
            rate: 0.215,
            lang_code: "ja".to_string(),
            lang_name: "Japanese".to_string(),
        },
    }
}

fn expense_body(item: &str, amount: f64) -> serde_json::Value {
    json!({ "item": item, "amount": amount, "payerName": "A", "splitParticipants": ["A", "B"] })
}

#[tokio::test]
async fn trip_document_put_get_and_find() {
    let (store, _db) = store_with_db().await;
    let document = trip_document("ABCDEF");

    store.put_trip("t1", &document).await.unwrap();
    assert_eq!(store.get_trip("t1").await.unwrap(), Some(document.clone()));
    assert_eq!(store.get_trip("nope").await.unwrap(), None);

    let mut renamed = document.clone();
    renamed.title = "Kyoto".to_string();
    store.put_trip("t1", &renamed).await.unwrap();

    let code: InviteCode = "abcdef".parse().unwrap();
    let (id, found) = store.find_trip_by_invite_code(&code).await.unwrap().unwrap();
    assert_eq!(id, "t1");
    assert_eq!(found.title, "Kyoto");

    let unknown: InviteCode = "ZZZZZZ".parse().unwrap();
    assert!(store.find_trip_by_invite_code(&unknown).await.unwrap().is_none());
}

#[tokio::test]
async fn documents_upsert_read_and_delete() {
    let (store, _db) = store_with_db().await;
    store.put_trip("t1", &trip_document("ABCDEF")).await.unwrap();
    let path = CollectionPath::shared_expenses("t1");

    store
        .upsert(&path, Document { key: "k1".to_string(), body: expense_body("Lunch", 10.0) })
        .await
        .unwrap();
    store
        .upsert(&path, Document { key: "k2".to_string(), body: expense_body("Tea", 4.0) })
        .await
        .unwrap();
    store
        .upsert(&path, Document { key: "k1".to_string(), body: expense_body("Lunch", 12.0) })
        .await
        .unwrap();

    let documents = store.read_all(&path).await.unwrap();
    assert_eq!(documents.len(), 2);
    let lunch = documents.iter().find(|d| d.key == "k1").unwrap();
    assert_eq!(lunch.body["amount"], json!(12.0));

    // Other collections of the same trip are untouched.
    assert!(store.read_all(&CollectionPath::days("t1")).await.unwrap().is_empty());

    assert!(store.delete(&path, "k2").await.unwrap());
    assert!(!store.delete(&path, "k2").await.unwrap());
    assert_eq!(store.delete_all(&path).await.unwrap(), 1);
    assert!(store.read_all(&path).await.unwrap().is_empty());
}

#[tokio::test]
async fn subscription_sees_own_writes() {
    let (store, _db) = store_with_db().await;
    store.put_trip("t1", &trip_document("ABCDEF")).await.unwrap();
    let path = CollectionPath::shared_expenses("t1");

    let mut subscription = store.subscribe(&path).await.unwrap();
    let initial = subscription.next().await.unwrap();
    assert!(initial.documents.is_empty());

    store
        .upsert(&path, Document { key: "k1".to_string(), body: expense_body("Lunch", 10.0) })
        .await
        .unwrap();
    store
        .upsert(&CollectionPath::days("t1"), Document { key: "day-000".to_string(), body: json!({}) })
        .await
        .unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(2), subscription.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.path, path);
    assert_eq!(snapshot.documents.len(), 1);
    assert_eq!(snapshot.expenses().unwrap()[0].item, "Lunch");
}

#[tokio::test]
async fn polling_picks_up_foreign_writes() {
    let db = database().await;
    let watcher = SqlDocumentStore::builder()
        .database(db.clone())
        .poll_interval(Some(Duration::from_millis(20)))
        .build()
        .await
        .unwrap();
    // A second store on the same database does not share the watcher's
    // in-process notifications.
    let writer = SqlDocumentStore::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    writer.put_trip("t1", &trip_document("ABCDEF")).await.unwrap();
    let path = CollectionPath::shared_expenses("t1");

    let mut subscription = watcher.subscribe(&path).await.unwrap();
    assert!(subscription.next().await.unwrap().documents.is_empty());

    writer
        .upsert(&path, Document { key: "k1".to_string(), body: expense_body("Lunch", 10.0) })
        .await
        .unwrap();

    let snapshot = tokio::time::timeout(Duration::from_secs(5), subscription.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.documents.len(), 1);
    assert_eq!(snapshot.documents[0].key, "k1");
}
