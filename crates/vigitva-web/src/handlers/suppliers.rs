//! Supplier CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use vigitva_common::{NewSupplier, Supplier, SupplierPatch};
use vigitva_db::SupplierRepository;

use crate::error::ApiError;
use crate::state::SharedState;

fn repo(state: &SharedState) -> SupplierRepository {
    SupplierRepository::new(state.db.clone())
}

/// GET /api/suppliers
pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Supplier>>, ApiError> {
    Ok(Json(repo(&state).list().await?))
}

/// POST /api/suppliers
pub async fn create(
    State(state): State<SharedState>,
    Json(input): Json<NewSupplier>,
) -> Result<(StatusCode, Json<Supplier>), ApiError> {
    let company = repo(&state).save(input).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/suppliers/{id}
pub async fn get(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Result<Json<Supplier>, ApiError> {
    repo(&state)
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Supplier", id))
}

/// PATCH /api/suppliers/{id}
pub async fn update(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SupplierPatch>,
) -> Result<Json<Supplier>, ApiError> {
    repo(&state)
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Supplier", id))
}

/// DELETE /api/suppliers/{id}
pub async fn delete(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if repo(&state).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Supplier", id))
    }
}
