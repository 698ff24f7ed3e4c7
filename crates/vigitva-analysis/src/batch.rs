//! Batch analysis of several invoice files.
//!
//! Files are processed one after another. Each goes `pending → processing →
//! completed`, its own progress climbing from 0 to 100 in steps of 10.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;
use vigitva_common::risk::{percentage, MAX_SCORE};
use vigitva_common::{RiskDistribution, RiskLevel};
use vigitva_db::{AppEvent, EventBus};

const PROGRESS_STEP: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFileStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFile {
    pub id: Uuid,
    pub name: String,
    pub status: BatchFileStatus,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

impl BatchFile {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: BatchFileStatus::Pending,
            progress: 0,
            risk_score: None,
            risk_level: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub distribution: RiskDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub id: Uuid,
    pub files: Vec<BatchFile>,
    pub overall_progress: u8,
    pub finished: bool,
    pub created_at: DateTime<Utc>,
}

impl BatchJob {
    /// A job over the non-blank names in `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .map(BatchFile::pending)
            .collect();
        Self {
            id: Uuid::new_v4(),
            files,
            overall_progress: 0,
            finished: false,
            created_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> BatchSummary {
        let done = self.files.iter().filter(|f| f.status == BatchFileStatus::Completed);
        let distribution = RiskDistribution::from_levels(done.clone().filter_map(|f| f.risk_level));
        BatchSummary {
            total: self.files.len(),
            completed: done.count(),
            distribution,
        }
    }
}

pub type SharedBatch = Arc<RwLock<BatchJob>>;

#[derive(Debug, Clone)]
pub struct BatchRunner {
    step_delay: Duration,
    events: Option<EventBus>,
}

impl BatchRunner {
    pub fn new(step_delay: Duration, events: Option<EventBus>) -> Self {
        Self { step_delay, events }
    }

    /// Process every pending file of `job`, publishing progress as it goes.
    pub async fn run<R: Rng + Send>(&self, job: SharedBatch, rng: &mut R) -> BatchSummary {
        let (batch_id, total) = {
            let job = job.read().await;
            (job.id, job.files.len())
        };
        tracing::info!(%batch_id, files = total, "Batch started");

        for index in 0..total {
            let name = {
                let mut job = job.write().await;
                let file = &mut job.files[index];
                if file.status != BatchFileStatus::Pending {
                    continue;
                }
                file.status = BatchFileStatus::Processing;
                file.name.clone()
            };

            let overall = percentage(index, total) as u8;
            for step in 0..=(100 / PROGRESS_STEP) {
                if !self.step_delay.is_zero() {
                    tokio::time::sleep(self.step_delay).await;
                }
                let progress = step * PROGRESS_STEP;
                job.write().await.files[index].progress = progress;
                self.publish(batch_id, &name, progress, overall);
            }

            let score = rng.gen_range(1..=MAX_SCORE);
            let level = RiskLevel::from_score(score);
            let overall = percentage(index + 1, total) as u8;
            {
                let mut job = job.write().await;
                let file = &mut job.files[index];
                file.status = BatchFileStatus::Completed;
                file.progress = 100;
                file.risk_score = Some(score);
                file.risk_level = Some(level);
                job.overall_progress = overall;
            }
            self.publish(batch_id, &name, 100, overall);
            tracing::debug!(%batch_id, file = %name, score, level = %level, "Batch file scored");
        }

        let mut job = job.write().await;
        job.finished = true;
        job.overall_progress = 100;
        let summary = job.summary();
        tracing::info!(%batch_id, completed = summary.completed, "Batch finished");
        summary
    }

    fn publish(&self, batch_id: Uuid, file_name: &str, file_progress: u8, overall_progress: u8) {
        if let Some(events) = &self.events {
            events.emit(AppEvent::BatchProgress {
                batch_id,
                file_name: file_name.to_string(),
                file_progress,
                overall_progress,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigitva_test_utils::seeded_rng;

    fn shared(job: BatchJob) -> SharedBatch {
        Arc::new(RwLock::new(job))
    }

    #[test]
    fn test_new_job_skips_blank_names() {
        let job = BatchJob::new(["facture-1.pdf", "  ", "facture-2.pdf"]);
        assert_eq!(job.files.len(), 2);
        assert!(job.files.iter().all(|f| f.status == BatchFileStatus::Pending && f.progress == 0));
    }

    #[tokio::test]
    async fn test_run_completes_every_file() {
        let job = shared(BatchJob::new(["a.pdf", "b.pdf", "c.pdf"]));
        let runner = BatchRunner::new(Duration::ZERO, None);

        let summary = runner.run(job.clone(), &mut seeded_rng(4)).await;

        let job = job.read().await;
        assert!(job.finished);
        assert_eq!(job.overall_progress, 100);
        for f in &job.files {
            assert_eq!(f.status, BatchFileStatus::Completed);
            assert_eq!(f.progress, 100);
            let score = f.risk_score.unwrap();
            assert!((1..=12).contains(&score));
            assert_eq!(f.risk_level, Some(RiskLevel::from_score(score)));
        }
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 3);
        assert_eq!(summary.distribution.total(), 3);
    }

    #[tokio::test]
    async fn test_overall_progress_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let job = shared(BatchJob::new(["a.pdf", "b.pdf"]));

        BatchRunner::new(Duration::ZERO, Some(bus)).run(job, &mut seeded_rng(8)).await;

        let mut finals = Vec::new();
        let mut count = 0;
        while let Ok(AppEvent::BatchProgress { file_progress, overall_progress, .. }) = rx.try_recv() {
            count += 1;
            if file_progress == 100 {
                finals.push(overall_progress);
            }
        }
        // 11 steps per file plus the completion event
        assert_eq!(count, 24);
        assert_eq!(finals, vec![0, 50, 50, 100]);
    }

    #[tokio::test]
    async fn test_empty_job_finishes_immediately() {
        let job = shared(BatchJob::new(Vec::<String>::new()));
        let summary = BatchRunner::new(Duration::from_millis(200), None).run(job.clone(), &mut seeded_rng(1)).await;
        assert_eq!(summary, BatchSummary::default());
        assert!(job.read().await.finished);
    }
}
