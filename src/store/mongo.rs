use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document, doc};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::error::{TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT};
use mongodb::options::{ClientOptions, FindOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, ClientSession, Collection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::MongoConfig;
use crate::models::id::DocumentId;
use crate::models::parcel::{NewParcel, Parcel, PaymentStatus};
use crate::models::payment::{NewPayment, Payment, PaymentOutcome};
use crate::store::{BookingStore, StoreError};

const PARCELS: &str = "parcels";
const PAYMENTS: &str = "payments";

/// Stored shape of a payment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    parcel_id: String,
    email: String,
    amount: f64,
    payment_method: String,
    transaction_id: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    created_at: DateTime<Utc>,
}

impl PaymentDocument {
    fn into_payment(self) -> Result<Payment, StoreError> {
        let id = self
            .id
            .ok_or_else(|| StoreError::Malformed("payment without _id".to_string()))?;

        Ok(Payment {
            id: id.into(),
            parcel_id: self.parcel_id,
            email: self.email,
            amount: self.amount,
            payment_method: self.payment_method,
            transaction_id: self.transaction_id,
            created_at: self.created_at,
        })
    }
}

impl From<&NewPayment> for PaymentDocument {
    fn from(payment: &NewPayment) -> Self {
        Self {
            id: None,
            parcel_id: payment.parcel_id.to_hex(),
            email: payment.email.clone(),
            amount: payment.amount,
            payment_method: payment.payment_method.clone(),
            transaction_id: payment.transaction_id.clone(),
            created_at: payment.created_at,
        }
    }
}

fn parcel_to_document(parcel: &NewParcel) -> Result<Document, StoreError> {
    let mut document = bson::to_document(&parcel.fields)?;
    document.insert("createdAt", bson::DateTime::from_chrono(parcel.created_at));
    Ok(document)
}

fn document_to_parcel(mut document: Document) -> Result<Parcel, StoreError> {
    let id = match document.remove("_id") {
        Some(Bson::ObjectId(oid)) => DocumentId::from(oid),
        other => {
            return Err(StoreError::Malformed(format!(
                "parcel _id is not an object id: {other:?}"
            )));
        }
    };

    let created_at = match document.remove("createdAt") {
        Some(Bson::DateTime(ts)) => ts.to_chrono(),
        other => {
            return Err(StoreError::Malformed(format!(
                "parcel {id} has no createdAt timestamp: {other:?}"
            )));
        }
    };

    let payment_status = match document.remove("paymentStatus") {
        Some(Bson::String(status)) if status == PaymentStatus::Paid.as_str() => {
            Some(PaymentStatus::Paid)
        }
        Some(Bson::Null) | None => None,
        Some(other) => {
            return Err(StoreError::Malformed(format!(
                "parcel {id} has unknown paymentStatus {other}"
            )));
        }
    };

    let fields = match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => return Err(StoreError::Malformed(format!("parcel {id} is not an object"))),
    };

    Ok(Parcel {
        id,
        created_at,
        payment_status,
        fields,
    })
}

fn inserted_object_id(inserted: Bson) -> Result<DocumentId, StoreError> {
    inserted
        .as_object_id()
        .map(DocumentId::from)
        .ok_or_else(|| {
            StoreError::Malformed(format!("inserted id is not an object id: {inserted}"))
        })
}

const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    RetryTransaction,
    RetryCommit,
    GiveUp,
}

/// Maps the driver's error labels to the recovery the transactions API prescribes.
fn recovery_for(has_label: impl Fn(&str) -> bool) -> Recovery {
    if has_label(TRANSIENT_TRANSACTION_ERROR) {
        Recovery::RetryTransaction
    } else if has_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) {
        Recovery::RetryCommit
    } else {
        Recovery::GiveUp
    }
}

fn is_transient(err: &StoreError) -> bool {
    match err {
        StoreError::Database(err) => {
            recovery_for(|label| err.contains_label(label)) == Recovery::RetryTransaction
        }
        _ => false,
    }
}

/// Commits, re-sending the commit while its outcome is unknown.
async fn commit(session: &mut ClientSession) -> Result<(), StoreError> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(err)
                if recovery_for(|label| err.contains_label(label)) == Recovery::RetryCommit
                    && attempt < MAX_TRANSACTION_ATTEMPTS =>
            {
                warn!(error = %err, attempt, "payment commit result unknown, retrying");
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// MongoDB-backed store. One client is opened at startup and shared by every request.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    parcels: Collection<Document>,
    payments: Collection<PaymentDocument>,
}

impl MongoStore {
    pub async fn connect(config: &MongoConfig) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(&config.uri).await?;
        options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .strict(true)
                .deprecation_errors(true)
                .build(),
        );

        let client = Client::with_options(options)?;
        let database = client.database(&config.database);

        let store = Self {
            parcels: database.collection(PARCELS),
            payments: database.collection(PAYMENTS),
            client,
        };

        store.ping().await?;
        info!(database = %config.database, "connected to mongodb");

        Ok(store)
    }

    /// Releases pooled connections once in-flight sessions and cursors are dropped.
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("mongodb client closed");
    }

    async fn record_payment_in(
        &self,
        session: &mut ClientSession,
        payment: &NewPayment,
    ) -> Result<PaymentOutcome, StoreError> {
        let parcel_filter = doc! { "_id": payment.parcel_id.object_id() };

        let existing = self
            .parcels
            .find_one_with_session(parcel_filter.clone(), None, session)
            .await?;
        if existing.is_none() {
            return Ok(PaymentOutcome::ParcelNotFound);
        }

        let mut unpaid_filter = parcel_filter;
        unpaid_filter.insert("paymentStatus", doc! { "$ne": PaymentStatus::Paid.as_str() });

        let update = self
            .parcels
            .update_one_with_session(
                unpaid_filter,
                doc! { "$set": { "paymentStatus": PaymentStatus::Paid.as_str() } },
                None,
                session,
            )
            .await?;
        if update.modified_count == 0 {
            return Ok(PaymentOutcome::AlreadyPaid);
        }

        let inserted = self
            .payments
            .insert_one_with_session(PaymentDocument::from(payment), None, session)
            .await?;
        let id = inserted_object_id(inserted.inserted_id)?;

        Ok(PaymentOutcome::Recorded(payment.clone().into_payment(id)))
    }
}

#[async_trait]
impl BookingStore for MongoStore {
    async fn insert_parcel(&self, parcel: NewParcel) -> Result<DocumentId, StoreError> {
        let document = parcel_to_document(&parcel)?;
        let result = self.parcels.insert_one(document, None).await?;
        inserted_object_id(result.inserted_id)
    }

    async fn list_parcels(&self) -> Result<Vec<Parcel>, StoreError> {
        let documents: Vec<Document> = self
            .parcels
            .find(doc! {}, None)
            .await?
            .try_collect()
            .await?;
        documents.into_iter().map(document_to_parcel).collect()
    }

    async fn parcels_by_owner(&self, email: &str) -> Result<Vec<Parcel>, StoreError> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1 })
            .build();
        let documents: Vec<Document> = self
            .parcels
            .find(doc! { "userEmail": email }, options)
            .await?
            .try_collect()
            .await?;
        documents.into_iter().map(document_to_parcel).collect()
    }

    async fn find_parcel(&self, id: DocumentId) -> Result<Option<Parcel>, StoreError> {
        self.parcels
            .find_one(doc! { "_id": id.object_id() }, None)
            .await?
            .map(document_to_parcel)
            .transpose()
    }

    async fn delete_parcel(&self, id: DocumentId) -> Result<u64, StoreError> {
        let result = self
            .parcels
            .delete_one(doc! { "_id": id.object_id() }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn payments_by_payer(&self, email: &str) -> Result<Vec<Payment>, StoreError> {
        let documents: Vec<PaymentDocument> = self
            .payments
            .find(doc! { "email": email }, None)
            .await?
            .try_collect()
            .await?;
        documents
            .into_iter()
            .map(PaymentDocument::into_payment)
            .collect()
    }

    async fn record_payment(&self, payment: NewPayment) -> Result<PaymentOutcome, StoreError> {
        let mut session = self.client.start_session(None).await?;
        let mut attempt = 1;

        loop {
            session.start_transaction(None).await?;

            let outcome = match self.record_payment_in(&mut session, &payment).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    if let Err(abort_err) = session.abort_transaction().await {
                        warn!(error = %abort_err, "failed to abort payment transaction");
                    }
                    if is_transient(&err) && attempt < MAX_TRANSACTION_ATTEMPTS {
                        warn!(error = %err, attempt, "retrying payment transaction");
                        attempt += 1;
                        continue;
                    }
                    return Err(err);
                }
            };

            if !matches!(outcome, PaymentOutcome::Recorded(_)) {
                session.abort_transaction().await?;
                return Ok(outcome);
            }

            match commit(&mut session).await {
                Ok(()) => return Ok(outcome),
                Err(err) if is_transient(&err) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    warn!(error = %err, attempt, "retrying payment transaction after commit");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await?;
        Ok(())
    }
}
