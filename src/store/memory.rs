use std::cmp::Ordering;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::id::DocumentId;
use crate::models::parcel::{NewParcel, Parcel, PaymentStatus};
use crate::models::payment::{NewPayment, Payment, PaymentOutcome};
use crate::store::{BookingStore, StoreError};

/// Process-local store with the same semantics as the MongoDB backend.
#[derive(Default)]
pub struct InMemoryStore {
    parcels: DashMap<DocumentId, Parcel>,
    payments: DashMap<DocumentId, Payment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payment_count(&self) -> usize {
        self.payments.len()
    }
}

fn insertion_order(a: &Parcel, b: &Parcel) -> Ordering {
    a.id.object_id().cmp(&b.id.object_id())
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_parcel(&self, parcel: NewParcel) -> Result<DocumentId, StoreError> {
        let id = DocumentId::generate();
        self.parcels.insert(id, parcel.into_parcel(id));
        Ok(id)
    }

    async fn list_parcels(&self) -> Result<Vec<Parcel>, StoreError> {
        let mut parcels: Vec<Parcel> = self
            .parcels
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        parcels.sort_by(insertion_order);
        Ok(parcels)
    }

    async fn parcels_by_owner(&self, email: &str) -> Result<Vec<Parcel>, StoreError> {
        let mut parcels: Vec<Parcel> = self
            .parcels
            .iter()
            .filter(|entry| entry.value().owner_email() == Some(email))
            .map(|entry| entry.value().clone())
            .collect();
        parcels.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| insertion_order(b, a))
        });
        Ok(parcels)
    }

    async fn find_parcel(&self, id: DocumentId) -> Result<Option<Parcel>, StoreError> {
        Ok(self.parcels.get(&id).map(|entry| entry.value().clone()))
    }

    async fn delete_parcel(&self, id: DocumentId) -> Result<u64, StoreError> {
        Ok(self.parcels.remove(&id).map_or(0, |_| 1))
    }

    async fn payments_by_payer(&self, email: &str) -> Result<Vec<Payment>, StoreError> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .filter(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone())
            .collect();
        payments.sort_by_key(|payment| payment.id.object_id());
        Ok(payments)
    }

    async fn record_payment(&self, payment: NewPayment) -> Result<PaymentOutcome, StoreError> {
        // The parcel's shard lock is held until the payment row exists.
        let Some(mut parcel) = self.parcels.get_mut(&payment.parcel_id) else {
            return Ok(PaymentOutcome::ParcelNotFound);
        };

        if parcel.is_paid() {
            return Ok(PaymentOutcome::AlreadyPaid);
        }

        let id = DocumentId::generate();
        let payment = payment.into_payment(id);
        parcel.payment_status = Some(PaymentStatus::Paid);
        self.payments.insert(id, payment.clone());

        Ok(PaymentOutcome::Recorded(payment))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::{Map, Value, json};

    use super::*;

    fn parcel_for(email: &str, minutes_ago: i64) -> NewParcel {
        let mut fields = Map::new();
        fields.insert("userEmail".to_string(), Value::String(email.to_string()));
        fields.insert("weight".to_string(), json!(1));
        NewParcel {
            created_at: Utc::now() - Duration::minutes(minutes_ago),
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
    async fn owner_listing_is_filtered_and_newest_first() {
        let store = InMemoryStore::new();
        let oldest = store.insert_parcel(parcel_for("a@x.com", 30)).await.unwrap();
        let newest = store.insert_parcel(parcel_for("a@x.com", 1)).await.unwrap();
        let middle = store.insert_parcel(parcel_for("a@x.com", 10)).await.unwrap();
        store.insert_parcel(parcel_for("b@x.com", 0)).await.unwrap();

        let ids: Vec<DocumentId> = store
            .parcels_by_owner("a@x.com")
            .await
            .unwrap()
            .into_iter()
            .map(|parcel| parcel.id)
            .collect();

        assert_eq!(ids, vec![newest, middle, oldest]);
        assert_eq!(store.list_parcels().await.unwrap().len(), 4);
        assert!(store.parcels_by_owner("nobody@x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let store = InMemoryStore::new();
        let id = store.insert_parcel(parcel_for("a@x.com", 0)).await.unwrap();

        assert_eq!(store.delete_parcel(id).await.unwrap(), 1);
        assert_eq!(store.delete_parcel(id).await.unwrap(), 0);
        assert!(store.find_parcel(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_payment_is_refused() {
        let store = InMemoryStore::new();
        let id = store.insert_parcel(parcel_for("a@x.com", 0)).await.unwrap();

        let first = store.record_payment(payment_for(id, "tx1")).await.unwrap();
        assert!(matches!(first, PaymentOutcome::Recorded(ref p) if p.parcel_id == id.to_hex()));

        let second = store.record_payment(payment_for(id, "tx2")).await.unwrap();
        assert_eq!(second, PaymentOutcome::AlreadyPaid);
        assert_eq!(store.payment_count(), 1);
        assert!(store.find_parcel(id).await.unwrap().unwrap().is_paid());
    }

    #[tokio::test]
    async fn payment_for_unknown_parcel_writes_nothing() {
        let store = InMemoryStore::new();
        let outcome = store
            .record_payment(payment_for(DocumentId::generate(), "tx1"))
            .await
            .unwrap();

        assert_eq!(outcome, PaymentOutcome::ParcelNotFound);
        assert_eq!(store.payment_count(), 0);
    }
}
