//! LLM audit trail.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use vigitva_llm::LlmAuditEntry;

use crate::state::SharedState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub llm_enabled: bool,
    pub model: String,
    pub calls: Vec<LlmAuditEntry>,
}

/// GET /api/system/audit
pub async fn audit(State(state): State<SharedState>) -> Json<AuditReport> {
    Json(AuditReport {
        llm_enabled: state.advisor.is_enabled(),
        model: state.config.llm.model.clone(),
        calls: state.advisor.audit().recent(),
    })
}
