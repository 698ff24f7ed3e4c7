//! VAT simulator endpoints.

use axum::Json;
use serde::Deserialize;
use vigitva_common::vat::{calculate as vat_calculate, CalculationMode, VatBreakdown, VatRate, VAT_RATES};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct VatRequest {
    pub amount: f64,
    pub rate: f64,
    pub mode: CalculationMode,
}

/// GET /api/vat/rates
pub async fn rates() -> Json<&'static [VatRate]> {
    Json(&VAT_RATES[..])
}

/// POST /api/vat/calculate
pub async fn calculate(Json(req): Json<VatRequest>) -> Result<Json<VatBreakdown>, ApiError> {
    Ok(Json(vat_calculate(req.amount, req.rate, req.mode)?))
}
