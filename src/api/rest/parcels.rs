use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{AppError, internal};
use crate::models::id::DocumentId;
use crate::models::parcel::{NewParcel, Parcel};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/parcels", post(create_parcel).get(list_parcels))
        .route("/parcels/:email", get(list_parcels_by_owner))
        .route("/parcel/:id", get(get_parcel))
        .route("/delete/:id", delete(delete_parcel))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub acknowledged: bool,
    pub inserted_id: DocumentId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

pub(crate) fn parse_id(raw: &str) -> Result<DocumentId, AppError> {
    raw.parse()
        .map_err(|err| AppError::BadRequest(format!("invalid id {raw}: {err}")))
}

async fn create_parcel(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<InsertAck>, AppError> {
    let parcel = NewParcel::from_submission(payload, Utc::now());

    let id = state
        .store
        .insert_parcel(parcel)
        .await
        .map_err(|err| internal("failed to create parcel", err))?;

    info!(parcel_id = %id, "parcel created");

    Ok(Json(InsertAck {
        acknowledged: true,
        inserted_id: id,
    }))
}

async fn list_parcels(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Parcel>>, AppError> {
    let parcels = state
        .store
        .list_parcels()
        .await
        .map_err(|err| internal("failed to fetch parcels", err))?;

    Ok(Json(parcels))
}

async fn list_parcels_by_owner(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<Vec<Parcel>>, AppError> {
    let parcels = state
        .store
        .parcels_by_owner(&email)
        .await
        .map_err(|err| internal("failed to fetch parcels", err))?;

    Ok(Json(parcels))
}

async fn get_parcel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Parcel>>, AppError> {
    let id = parse_id(&id)?;

    let parcel = state
        .store
        .find_parcel(id)
        .await
        .map_err(|err| internal("failed to fetch parcel", err))?;

    Ok(Json(parcel))
}

async fn delete_parcel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAck>, AppError> {
    let id = parse_id(&id)?;

    let deleted_count = state
        .store
        .delete_parcel(id)
        .await
        .map_err(|err| internal("failed to delete parcel", err))?;

    info!(parcel_id = %id, deleted_count, "parcel delete processed");

    Ok(Json(DeleteAck {
        acknowledged: true,
        deleted_count,
    }))
}
