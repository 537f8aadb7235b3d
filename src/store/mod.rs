pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::id::DocumentId;
use crate::models::parcel::{NewParcel, Parcel};
use crate::models::payment::{NewPayment, Payment, PaymentOutcome};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("document encoding error: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Persistence for parcels and the payments recorded against them.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_parcel(&self, parcel: NewParcel) -> Result<DocumentId, StoreError>;

    /// Every parcel in insertion order.
    async fn list_parcels(&self) -> Result<Vec<Parcel>, StoreError>;

    /// Parcels whose `userEmail` matches, newest first.
    async fn parcels_by_owner(&self, email: &str) -> Result<Vec<Parcel>, StoreError>;

    async fn find_parcel(&self, id: DocumentId) -> Result<Option<Parcel>, StoreError>;

    /// Returns how many documents were removed (0 or 1).
    async fn delete_parcel(&self, id: DocumentId) -> Result<u64, StoreError>;

    async fn payments_by_payer(&self, email: &str) -> Result<Vec<Payment>, StoreError>;

    /// Marks the parcel paid and inserts the payment row as a single unit.
    /// Neither write is visible unless both succeed.
    async fn record_payment(&self, payment: NewPayment) -> Result<PaymentOutcome, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
