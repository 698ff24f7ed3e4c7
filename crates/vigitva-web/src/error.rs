//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vigitva_analysis::{EngineError, ReportError};
use vigitva_common::VigitvaError;
use vigitva_db::StoreError;

/// Message returned when an analysis request cannot be processed.
pub const ANALYSIS_FAILED: &str = "Erreur lors de l'analyse";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    code: u16,
}

impl ApiError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} not found: {}", what, id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorBody { success: false, error: self.to_string(), code: status.as_u16() };
        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            StoreError::Validation(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<VigitvaError> for ApiError {
    fn from(e: VigitvaError) -> Self {
        match e {
            VigitvaError::EntityNotFound(msg) => ApiError::NotFound(msg),
            VigitvaError::Validation(msg) => ApiError::BadRequest(msg),
            VigitvaError::UnknownValue(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Store(e) => e.into(),
            EngineError::Wizard(e) => ApiError::BadRequest(e.to_string()),
            e @ (EngineError::CompanyNotFound(_) | EngineError::SupplierNotFound(_)) => {
                ApiError::NotFound(e.to_string())
            }
        }
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
