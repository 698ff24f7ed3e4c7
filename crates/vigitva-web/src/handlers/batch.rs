//! Batch analysis jobs. A job runs in the background; clients poll it or
//! follow `batch:progress` on the event stream.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use vigitva_analysis::{BatchJob, BatchSummary};

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct StartBatch {
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchStatus {
    pub job: BatchJob,
    pub summary: BatchSummary,
}

/// POST /api/batch
pub async fn start(
    State(state): State<SharedState>,
    Json(req): Json<StartBatch>,
) -> Result<(StatusCode, Json<BatchJob>), ApiError> {
    let job = BatchJob::new(&req.files);
    if job.files.is_empty() {
        return Err(ApiError::BadRequest("No files to analyse".into()));
    }
    let snapshot = job.clone();
    let shared = Arc::new(RwLock::new(job));
    state.batches.insert(snapshot.id, shared.clone()).await;

    let runner = state.batch_runner.clone();
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        runner.run(shared, &mut rng).await;
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// GET /api/batch/{id}
pub async fn status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BatchStatus>, ApiError> {
    let shared = state.batches.get(&id).await.ok_or_else(|| ApiError::not_found("Batch", id))?;
    let job = shared.read().await.clone();
    let summary = job.summary();
    Ok(Json(BatchStatus { job, summary }))
}
