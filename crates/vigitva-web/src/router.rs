//! Axum router: maps URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    analyses, analyze::analyze_invoice, batch, companies, dashboard::dashboard, documents,
    health::health, reports, stats, suppliers, system, vat, weather,
};
use crate::sse::sse_handler;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.server.static_dir.clone();
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Pages
        .route("/",       get(dashboard))
        .route("/health", get(health))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        // AI proxy
        .route("/api/analyze-invoice", post(analyze_invoice))

        // Companies and suppliers
        .route("/api/companies",      get(companies::list).post(companies::create))
        .route("/api/companies/{id}", get(companies::get).patch(companies::update).delete(companies::delete))
        .route("/api/suppliers",      get(suppliers::list).post(suppliers::create))
        .route("/api/suppliers/{id}", get(suppliers::get).patch(suppliers::update).delete(suppliers::delete))

        // Invoice analyses
        .route("/api/analyses",                 get(analyses::list).post(analyses::submit))
        .route("/api/analyses/{id}",            get(analyses::get).delete(analyses::delete))
        .route("/api/analyses/{id}/report.csv", get(analyses::report_csv))
        .route("/api/analyses/{id}/report.html", get(analyses::report_html))

        // Document analyses
        .route("/api/documents/{kind}",                 get(documents::list).post(documents::submit))
        .route("/api/documents/{kind}/{id}",            get(documents::get))
        .route("/api/documents/{kind}/{id}/report.csv", get(documents::report_csv))
        .route("/api/documents/{kind}/{id}/report.html", get(documents::report_html))

        .route("/api/reports/global.txt", get(reports::global))

        .route("/api/batch",      post(batch::start))
        .route("/api/batch/{id}", get(batch::status))

        // Statistics
        .route("/api/stats",           get(stats::advanced))
        .route("/api/stats/companies", get(stats::companies))
        .route("/api/stats/suppliers", get(stats::suppliers))
        .route("/api/stats/risk",      get(stats::risk))
        .route("/api/stats/trends",    get(stats::trends))

        .route("/api/vat/rates",     get(vat::rates))
        .route("/api/vat/calculate", post(vat::calculate))
        .route("/api/weather",       get(weather::current))
        .route("/api/system/audit",  get(system::audit))

        // Static files
        .nest_service("/static", ServeDir::new(static_dir))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
