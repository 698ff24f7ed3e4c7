//! In-process event bus.
//!
//! A `tokio::sync::broadcast` channel. A subscriber unsubscribes by
//! dropping its receiver; emitting with no subscribers is accepted.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;
use vigitva_common::{DocumentAnalysis, DocumentKind, InvoiceAnalysis};

const CHANNEL_CAPACITY: usize = 256;

/// Events pushed to subscribers (and from there to SSE clients).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum AppEvent {
    /// A document analysis was saved.
    #[serde(rename = "analysis:completed")]
    AnalysisCompleted { analysis: DocumentAnalysis },

    /// An invoice analysis was saved.
    #[serde(rename = "invoice:analyzed")]
    InvoiceAnalyzed { analysis: InvoiceAnalysis },

    /// A staged analysis moved to its next stage.
    #[serde(rename = "analysis:progress")]
    AnalysisProgress {
        run_id: Uuid,
        /// `None` for invoice analyses.
        kind: Option<DocumentKind>,
        stage: usize,
        message: String,
        progress: u8,
    },

    /// A batch file advanced.
    #[serde(rename = "batch:progress")]
    BatchProgress {
        batch_id: Uuid,
        file_name: String,
        file_progress: u8,
        overall_progress: u8,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Deliver to every live subscriber. Returns how many received it.
    pub fn emit(&self, event: AppEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
