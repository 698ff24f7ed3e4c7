//! Dashboard: the server-rendered landing page.

use axum::extract::State;
use axum::response::Html;
use minijinja::context;
use serde::Serialize;
use vigitva_common::DocumentKind;
use vigitva_db::stats::RecentAnalysis;
use vigitva_db::StatsRepository;

use super::analyses::name_book;
use crate::error::ApiError;
use crate::state::SharedState;
use crate::templates::render;

#[derive(Debug, Serialize)]
struct RecentRow {
    kind: &'static str,
    company: String,
    risk_class: &'static str,
    score: u8,
    date: String,
}

fn kind_label(tag: &str) -> &'static str {
    match tag.parse::<DocumentKind>() {
        Ok(kind) => kind.label(),
        Err(_) => "Facture",
    }
}

pub async fn dashboard(State(state): State<SharedState>) -> Result<Html<String>, ApiError> {
    let summary = StatsRepository::new(state.db.clone()).dashboard_summary().await?;
    let names = name_book(&state).await?;
    let weather = match &state.weather {
        Some(client) => client.current().await,
        None => None,
    };

    let recent: Vec<RecentRow> = summary
        .recent_analyses
        .iter()
        .map(|a: &RecentAnalysis| RecentRow {
            kind: kind_label(&a.kind),
            company: names.company(a.company_id).to_string(),
            risk_class: a.risk_level.css_class(),
            score: a.risk_score,
            date: a.created_at.format("%d/%m/%Y").to_string(),
        })
        .collect();

    let html = render(
        &state.templates,
        "dashboard.html",
        context! {
            active => "dashboard",
            llm_enabled => state.advisor.is_enabled(),
            weather => weather,
            summary => summary,
            recent => recent,
        },
    )?;
    Ok(Html(html))
}
