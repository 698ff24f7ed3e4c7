//! Shared application state for the web server.

use minijinja::Environment;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;
use vigitva_analysis::{AnalysisEngine, BatchRunner, InvoiceAdvisor, SharedBatch};
use vigitva_config::Config;
use vigitva_db::{Database, EventBus};
use vigitva_llm::{AuditLog, LlmBackend};

use crate::weather::WeatherClient;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    pub engine: AnalysisEngine,
    pub advisor: InvoiceAdvisor,
    pub batch_runner: BatchRunner,
    pub batches: BatchRegistry,
    pub weather: Option<WeatherClient>,
    pub templates: Environment<'static>,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config, llm: Option<Arc<dyn LlmBackend>>) -> Self {
        let audit = Arc::new(AuditLog::default());
        let engine = AnalysisEngine::new(db.clone(), config.analysis.progress_scale);
        let batch_runner = BatchRunner::new(
            Duration::from_millis(config.analysis.batch_step_delay_ms),
            Some(db.events().clone()),
        );
        let weather = WeatherClient::from_config(&config.weather);

        Self {
            engine,
            advisor: InvoiceAdvisor::new(llm, audit),
            batch_runner,
            batches: BatchRegistry::default(),
            weather,
            templates: crate::templates::environment(),
            db,
            config,
        }
    }

    pub fn events(&self) -> &EventBus {
        self.db.events()
    }
}

pub type SharedState = Arc<AppState>;

/// Jobs kept for status polling.
pub const MAX_TRACKED_BATCHES: usize = 64;

#[derive(Default)]
struct Tracked {
    jobs: HashMap<Uuid, SharedBatch>,
    order: VecDeque<Uuid>,
}

/// Recent batch jobs by id; the oldest is forgotten when full.
pub struct BatchRegistry {
    capacity: usize,
    tracked: RwLock<Tracked>,
}

impl BatchRegistry {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), tracked: RwLock::new(Tracked::default()) }
    }

    pub async fn insert(&self, id: Uuid, job: SharedBatch) {
        let mut tracked = self.tracked.write().await;
        if tracked.jobs.insert(id, job).is_some() {
            return;
        }
        tracked.order.push_back(id);
        while tracked.order.len() > self.capacity {
            if let Some(oldest) = tracked.order.pop_front() {
                tracked.jobs.remove(&oldest);
                tracing::debug!(batch_id = %oldest, "Batch dropped from registry");
            }
        }
    }

    pub async fn get(&self, id: &Uuid) -> Option<SharedBatch> {
        self.tracked.read().await.jobs.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.tracked.read().await.jobs.len()
    }
}

impl Default for BatchRegistry {
    fn default() -> Self {
        Self::new(MAX_TRACKED_BATCHES)
    }
}
