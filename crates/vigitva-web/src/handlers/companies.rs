//! Company CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;
use vigitva_common::{Company, CompanyPatch, NewCompany};
use vigitva_db::CompanyRepository;

use crate::error::ApiError;
use crate::state::SharedState;

fn repo(state: &SharedState) -> CompanyRepository {
    CompanyRepository::new(state.db.clone())
}

/// GET /api/companies
pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Company>>, ApiError> {
    Ok(Json(repo(&state).list().await?))
}

/// POST /api/companies
pub async fn create(
    State(state): State<SharedState>,
    Json(input): Json<NewCompany>,
) -> Result<(StatusCode, Json<Company>), ApiError> {
    let company = repo(&state).save(input).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /api/companies/{id}
pub async fn get(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Result<Json<Company>, ApiError> {
    repo(&state)
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Company", id))
}

/// PATCH /api/companies/{id}
pub async fn update(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CompanyPatch>,
) -> Result<Json<Company>, ApiError> {
    repo(&state)
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Company", id))
}

/// DELETE /api/companies/{id}
pub async fn delete(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if repo(&state).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Company", id))
    }
}
