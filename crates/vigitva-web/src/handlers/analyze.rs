//! POST /api/analyze-invoice: AI review of an invoice.
//!
//! Upstream failures never surface here: the advisor degrades to its
//! simulated answer and the route still returns 200. Only a request that
//! cannot be read at all yields a 500.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vigitva_analysis::AdvisorAnalysis;

use crate::error::{ApiError, ANALYSIS_FAILED};
use crate::state::SharedState;

/// Ids are taken as any JSON value and only interpolated into the prompt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeInvoiceRequest {
    #[serde(default)]
    pub company_id: Value,
    #[serde(default)]
    pub supplier_id: Value,
    #[serde(default)]
    pub invoice_data: Value,
}

/// Strings as-is, anything else in its JSON form (`5`, `null`).
fn display_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeInvoiceResponse {
    pub success: bool,
    pub analysis: AdvisorAnalysis,
}

pub async fn analyze_invoice(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<AnalyzeInvoiceResponse>, ApiError> {
    let req: AnalyzeInvoiceRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!(error = %e, "Unreadable analyze-invoice request");
        ApiError::Internal(ANALYSIS_FAILED.to_string())
    })?;

    let company_id = display_id(&req.company_id);
    let supplier_id = display_id(&req.supplier_id);
    let mut rng = StdRng::from_entropy();
    let advice = state
        .advisor
        .advise(&company_id, &supplier_id, &req.invoice_data, &mut rng)
        .await;

    tracing::info!(
        %company_id,
        %supplier_id,
        source = ?advice.source,
        score = advice.analysis.risk_score,
        "Invoice analysed"
    );
    Ok(Json(AnalyzeInvoiceResponse { success: true, analysis: advice.analysis }))
}
