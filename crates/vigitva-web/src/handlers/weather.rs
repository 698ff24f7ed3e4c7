use axum::extract::State;
use axum::Json;

use crate::state::SharedState;
use crate::weather::Weather;

/// GET /api/weather; `null` when unconfigured or the upstream call fails.
pub async fn current(State(state): State<SharedState>) -> Json<Option<Weather>> {
    match &state.weather {
        Some(client) => Json(client.current().await),
        None => Json(None),
    }
}
