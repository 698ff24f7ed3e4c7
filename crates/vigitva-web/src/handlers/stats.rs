use axum::extract::State;
use axum::Json;
use vigitva_db::stats::{AdvancedStats, EntityRiskStats, RiskEvaluation, TrendReport};
use vigitva_db::StatsRepository;

use crate::error::ApiError;
use crate::state::SharedState;

fn repo(state: &SharedState) -> StatsRepository {
    StatsRepository::new(state.db.clone())
}

/// GET /api/stats
pub async fn advanced(State(state): State<SharedState>) -> Result<Json<AdvancedStats>, ApiError> {
    Ok(Json(repo(&state).advanced_stats().await?))
}

/// GET /api/stats/companies
pub async fn companies(State(state): State<SharedState>) -> Result<Json<Vec<EntityRiskStats>>, ApiError> {
    Ok(Json(repo(&state).company_risk_stats().await?))
}

/// GET /api/stats/suppliers
pub async fn suppliers(State(state): State<SharedState>) -> Result<Json<Vec<EntityRiskStats>>, ApiError> {
    Ok(Json(repo(&state).supplier_risk_stats().await?))
}

/// GET /api/stats/risk
pub async fn risk(State(state): State<SharedState>) -> Result<Json<RiskEvaluation>, ApiError> {
    Ok(Json(repo(&state).risk_evaluation().await?))
}

/// GET /api/stats/trends
pub async fn trends(State(state): State<SharedState>) -> Result<Json<TrendReport>, ApiError> {
    Ok(Json(repo(&state).trends().await?))
}
