//! Document analyses (FEC, TVA, journals, bank flux).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;
use vigitva_analysis::report::{csv_report, document_report_filename, html_report};
use vigitva_analysis::{DocumentForm, ReportData};
use vigitva_common::DocumentAnalysis;
use vigitva_db::DocumentRepository;

use super::analyses::name_book;
use super::{download, parse_kind, CSV_TYPE, HTML_TYPE};
use crate::error::ApiError;
use crate::state::SharedState;

/// GET /api/documents/{kind}
pub async fn list(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
) -> Result<Json<Vec<DocumentAnalysis>>, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(DocumentRepository::new(state.db.clone()).list(kind).await?))
}

/// POST /api/documents/{kind}
pub async fn submit(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
    Json(form): Json<DocumentForm>,
) -> Result<(StatusCode, Json<DocumentAnalysis>), ApiError> {
    let kind = parse_kind(&kind)?;
    let mut rng = StdRng::from_entropy();
    let saved = state.engine.submit_document(Uuid::new_v4(), kind, form, &mut rng).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn find(state: &SharedState, kind: &str, id: Uuid) -> Result<DocumentAnalysis, ApiError> {
    let kind = parse_kind(kind)?;
    DocumentRepository::new(state.db.clone())
        .get(kind, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document analysis", id))
}

/// GET /api/documents/{kind}/{id}
pub async fn get(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<DocumentAnalysis>, ApiError> {
    Ok(Json(find(&state, &kind, id).await?))
}

/// GET /api/documents/{kind}/{id}/report.csv
pub async fn report_csv(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Response, ApiError> {
    let analysis = find(&state, &kind, id).await?;
    let data = ReportData::from_document(&analysis, &name_book(&state).await?);
    Ok(download(csv_report(&data)?, CSV_TYPE, &document_report_filename(&analysis, "csv")))
}

/// GET /api/documents/{kind}/{id}/report.html
pub async fn report_html(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Response, ApiError> {
    let analysis = find(&state, &kind, id).await?;
    let data = ReportData::from_document(&analysis, &name_book(&state).await?);
    Ok(download(html_report(&data)?, HTML_TYPE, &document_report_filename(&analysis, "html")))
}
