//! Runs against a live replica set: `MONGODB_URI=... cargo test -- --ignored`.

use bson::oid::ObjectId;
use chrono::Utc;
use mongodb::Client;
use parcel_booking::config::MongoConfig;
use parcel_booking::models::id::DocumentId;
use parcel_booking::models::parcel::NewParcel;
use parcel_booking::models::payment::{NewPayment, PaymentOutcome};
use parcel_booking::store::BookingStore;
use parcel_booking::store::mongo::MongoStore;
use serde_json::{Map, Value, json};

struct TestDatabase {
    uri: String,
    name: String,
    store: MongoStore,
}

impl TestDatabase {
    async fn open() -> Option<Self> {
        let uri = std::env::var("MONGODB_URI").ok()?;
        let name = format!("parcel_booking_test_{}", ObjectId::new().to_hex());
        let store = MongoStore::connect(&MongoConfig {
            uri: uri.clone(),
            database: name.clone(),
        })
        .await
        .unwrap();
        Some(Self { uri, name, store })
    }

    async fn drop_database(self) {
        let client = Client::with_uri_str(&self.uri).await.unwrap();
        client.database(&self.name).drop(None).await.unwrap();
        self.store.shutdown().await;
    }
}

fn parcel_for(email: &str) -> NewParcel {
    let mut fields = Map::new();
    fields.insert("userEmail".to_string(), Value::String(email.to_string()));
    fields.insert("weight".to_string(), json!(2));
    NewParcel {
        created_at: Utc::now(),
        fields,
    }
}

fn payment_for(parcel_id: DocumentId, tx: &str) -> NewPayment {
    NewPayment {
        parcel_id,
        email: "a@x.com".to_string(),
        amount: 500.0,
        payment_method: "card".to_string(),
        transaction_id: tx.to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore]
async fn payment_outcomes_against_mongodb() {
    let Some(db) = TestDatabase::open().await else {
        return;
    };
    let store = &db.store;

    let missing = store
        .record_payment(payment_for(DocumentId::generate(), "tx0"))
        .await
        .unwrap();
    assert_eq!(missing, PaymentOutcome::ParcelNotFound);

    let id = store.insert_parcel(parcel_for("a@x.com")).await.unwrap();
    let first = store.record_payment(payment_for(id, "tx1")).await.unwrap();
    assert!(matches!(first, PaymentOutcome::Recorded(_)));

    let second = store.record_payment(payment_for(id, "tx2")).await.unwrap();
    assert_eq!(second, PaymentOutcome::AlreadyPaid);

    assert!(store.find_parcel(id).await.unwrap().unwrap().is_paid());
    assert_eq!(store.payments_by_payer("a@x.com").await.unwrap().len(), 1);

    db.drop_database().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn concurrent_payments_record_exactly_once() {
    let Some(db) = TestDatabase::open().await else {
        return;
    };
    let id = db.store.insert_parcel(parcel_for("a@x.com")).await.unwrap();

    let mut handles = Vec::new();
    for n in 0..16 {
        let store = db.store.clone();
        handles.push(tokio::spawn(async move {
            store.record_payment(payment_for(id, &format!("tx{n}"))).await
        }));
    }

    let mut recorded = 0;
    let mut already_paid = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            PaymentOutcome::Recorded(_) => recorded += 1,
            PaymentOutcome::AlreadyPaid => already_paid += 1,
            PaymentOutcome::ParcelNotFound => panic!("parcel vanished"),
        }
    }

    assert_eq!(recorded, 1);
    assert_eq!(already_paid, 15);
    assert_eq!(db.store.payments_by_payer("a@x.com").await.unwrap().len(), 1);

    db.drop_database().await;
}
