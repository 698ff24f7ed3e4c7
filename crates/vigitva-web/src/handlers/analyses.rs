//! Invoice analyses: listing with filters, wizard submission, per-analysis
//! report downloads.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use uuid::Uuid;
use vigitva_analysis::report::{csv_report, html_report, invoice_report_filename};
use vigitva_analysis::{InvoiceForm, NameBook, ReportData, ReportFilter};
use vigitva_common::InvoiceAnalysis;
use vigitva_db::{AnalysisRepository, CompanyRepository, SupplierRepository};

use super::{download, CSV_TYPE, HTML_TYPE};
use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisListItem {
    #[serde(flatten)]
    pub analysis: InvoiceAnalysis,
    pub company_name: String,
    pub supplier_name: String,
}

pub(crate) async fn name_book(state: &SharedState) -> Result<NameBook, ApiError> {
    let companies = CompanyRepository::new(state.db.clone()).list().await?;
    let suppliers = SupplierRepository::new(state.db.clone()).list().await?;
    Ok(NameBook::new(&companies, &suppliers))
}

async fn find(state: &SharedState, id: Uuid) -> Result<InvoiceAnalysis, ApiError> {
    AnalysisRepository::new(state.db.clone())
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Analysis", id))
}

/// GET /api/analyses?search=&level=&period=
pub async fn list(
    State(state): State<SharedState>,
    Query(filter): Query<ReportFilter>,
) -> Result<Json<Vec<AnalysisListItem>>, ApiError> {
    let analyses = AnalysisRepository::new(state.db.clone()).list().await?;
    let names = name_book(&state).await?;
    let items = filter
        .apply(&analyses, &names, Utc::now())
        .into_iter()
        .map(|a| AnalysisListItem {
            company_name: names.company(a.company_id).to_string(),
            supplier_name: names.supplier(a.supplier_id).to_string(),
            analysis: a.clone(),
        })
        .collect();
    Ok(Json(items))
}

/// POST /api/analyses
pub async fn submit(
    State(state): State<SharedState>,
    Json(form): Json<InvoiceForm>,
) -> Result<(StatusCode, Json<InvoiceAnalysis>), ApiError> {
    let mut rng = StdRng::from_entropy();
    let saved = state.engine.submit_invoice(Uuid::new_v4(), form, &mut rng).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// GET /api/analyses/{id}
pub async fn get(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Result<Json<InvoiceAnalysis>, ApiError> {
    Ok(Json(find(&state, id).await?))
}

/// DELETE /api/analyses/{id}
pub async fn delete(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if AnalysisRepository::new(state.db.clone()).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Analysis", id))
    }
}

/// GET /api/analyses/{id}/report.csv
pub async fn report_csv(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let analysis = find(&state, id).await?;
    let data = ReportData::from_invoice(&analysis, &name_book(&state).await?);
    Ok(download(csv_report(&data)?, CSV_TYPE, &invoice_report_filename(id, "csv")))
}

/// GET /api/analyses/{id}/report.html
pub async fn report_html(State(state): State<SharedState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let analysis = find(&state, id).await?;
    let data = ReportData::from_invoice(&analysis, &name_book(&state).await?);
    Ok(download(html_report(&data)?, HTML_TYPE, &invoice_report_filename(id, "html")))
}
