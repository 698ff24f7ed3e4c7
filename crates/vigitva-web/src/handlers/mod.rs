//! HTTP handlers for all web routes.

pub mod analyses;
pub mod analyze;
pub mod batch;
pub mod companies;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod reports;
pub mod stats;
pub mod suppliers;
pub mod system;
pub mod vat;
pub mod weather;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use vigitva_common::DocumentKind;

use crate::error::ApiError;

pub const CSV_TYPE: &str = "text/csv; charset=utf-8";
pub const HTML_TYPE: &str = "text/html; charset=utf-8";
pub const TEXT_TYPE: &str = "text/plain; charset=utf-8";

/// Attachment response with the given file name.
pub(crate) fn download(body: String, content_type: &'static str, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        body,
    )
        .into_response()
}

pub(crate) fn parse_kind(raw: &str) -> Result<DocumentKind, ApiError> {
    raw.parse::<DocumentKind>().map_err(|_| ApiError::NotFound(format!("Unknown document type: {}", raw)))
}
