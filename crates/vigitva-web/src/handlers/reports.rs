//! Global report download.

use axum::extract::State;
use axum::response::Response;
use chrono::Utc;
use vigitva_analysis::report::{global_report_filename, global_text_report};
use vigitva_db::AnalysisRepository;

use super::analyses::name_book;
use super::{download, TEXT_TYPE};
use crate::error::ApiError;
use crate::state::SharedState;

/// GET /api/reports/global.txt
pub async fn global(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let analyses = AnalysisRepository::new(state.db.clone()).list().await?;
    let names = name_book(&state).await?;
    let now = Utc::now();
    let text = global_text_report(&analyses, &names, now);
    Ok(download(text, TEXT_TYPE, &global_report_filename(now)))
}
