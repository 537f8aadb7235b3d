use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::id::DocumentId;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub parcel_id: String,
    pub email: String,
    pub amount: f64,
    pub payment_method: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub parcel_id: DocumentId,
    pub email: String,
    pub amount: f64,
    pub payment_method: String,
    pub transaction_id: String,
    pub created_at: DateTime<Utc>,
}

impl NewPayment {
    pub fn into_payment(self, id: DocumentId) -> Payment {
        Payment {
            id,
            parcel_id: self.parcel_id.to_hex(),
            email: self.email,
            amount: self.amount,
            payment_method: self.payment_method,
            transaction_id: self.transaction_id,
            created_at: self.created_at,
        }
    }
}

/// Result of marking a parcel paid and logging the payment as one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Recorded(Payment),
    ParcelNotFound,
    AlreadyPaid,
}
