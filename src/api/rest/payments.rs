use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::rest::parcels::parse_id;
use crate::error::{AppError, internal};
use crate::models::id::DocumentId;
use crate::models::payment::{NewPayment, Payment, PaymentOutcome};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments", post(record_payment))
        .route("/payments/:email", get(list_payments_by_payer))
        .route("/create-payment-intent", post(create_payment_intent))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub parcel_id: String,
    pub email: String,
    pub amount: f64,
    pub payment_method: String,
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentResponse {
    pub success: bool,
    pub message: &'static str,
    pub inserted_id: DocumentId,
}

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub amount: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    pub client_secret: String,
}

async fn list_payments_by_payer(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = state
        .store
        .payments_by_payer(&email)
        .await
        .map_err(|err| internal("failed to fetch payments", err))?;

    Ok(Json(payments))
}

async fn record_payment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<RecordPaymentResponse>), AppError> {
    let parcel_id = parse_id(&payload.parcel_id)?;

    let payment = NewPayment {
        parcel_id,
        email: payload.email,
        amount: payload.amount,
        payment_method: payload.payment_method,
        transaction_id: payload.transaction_id,
        created_at: Utc::now(),
    };

    let outcome = state
        .store
        .record_payment(payment)
        .await
        .map_err(|err| internal("payment processing failed", err))?;

    match outcome {
        PaymentOutcome::Recorded(payment) => {
            info!(
                parcel_id = %parcel_id,
                payment_id = %payment.id,
                transaction_id = %payment.transaction_id,
                "payment recorded"
            );

            Ok((
                StatusCode::CREATED,
                Json(RecordPaymentResponse {
                    success: true,
                    message: "Payment recorded",
                    inserted_id: payment.id,
                }),
            ))
        }
        PaymentOutcome::ParcelNotFound => Err(AppError::NotFound(format!(
            "parcel {parcel_id} not found"
        ))),
        PaymentOutcome::AlreadyPaid => Err(AppError::Conflict(format!(
            "parcel {parcel_id} is already paid"
        ))),
    }
}

async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, AppError> {
    let intent = state
        .intents
        .create_intent(payload.amount)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, amount = payload.amount, "payment intent failed");
            AppError::Provider(err.to_string())
        })?;

    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
    }))
}
