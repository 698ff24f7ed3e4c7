//! Staged progress for long-running analyses.
//!
//! Every analysis walks a fixed list of stages. Each stage waits for its
//! duration (scaled by `analysis.progress_scale`) and then adds
//! `100 / stages.len()` to the progress, clamped to 100. Progress is
//! published on the event bus so the UI can follow along over SSE.

use std::time::Duration;
use uuid::Uuid;
use vigitva_common::DocumentKind;
use vigitva_db::{AppEvent, EventBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub message: &'static str,
    pub duration_ms: u64,
}

const fn stage(message: &'static str, duration_ms: u64) -> Stage {
    Stage { message, duration_ms }
}

pub const INVOICE_STAGES: [Stage; 6] = [
    stage("🔍 Extraction des données de la facture...", 3000),
    stage("🧮 Vérification des informations TVA...", 5000),
    stage("🤖 Analyse IA avec DeepSeek...", 8000),
    stage("📊 Calcul du score de risque...", 4000),
    stage("📋 Génération du rapport d'analyse...", 5000),
    stage("🌳 Application de l'arbre décisionnel...", 5000),
];

pub const FEC_STAGES: [Stage; 6] = [
    stage("📊 Lecture du fichier FEC...", 4000),
    stage("🔍 Validation de la structure comptable...", 5000),
    stage("🤖 Analyse IA DeepSeek des écritures...", 8000),
    stage("⚠️ Détection d'anomalies comptables...", 6000),
    stage("📈 Calcul des indicateurs de risque...", 4000),
    stage("📋 Génération du rapport FEC...", 3000),
];

pub const TVA_STAGES: [Stage; 6] = [
    stage("📄 Lecture de la déclaration TVA...", 3000),
    stage("🔍 Validation des montants déclarés...", 5000),
    stage("🤖 Analyse IA DeepSeek des données TVA...", 8000),
    stage("⚖️ Vérification de cohérence fiscale...", 6000),
    stage("📊 Calcul des écarts et anomalies...", 4000),
    stage("📋 Génération du rapport TVA...", 4000),
];

pub const JOURNAL_STAGES: [Stage; 6] = [
    stage("📚 Lecture des journaux comptables...", 4000),
    stage("🔍 Validation des écritures journalières...", 5000),
    stage("🤖 Analyse IA DeepSeek des mouvements...", 8000),
    stage("⚠️ Détection d'irrégularités comptables...", 6000),
    stage("📊 Analyse des patterns de fraude...", 5000),
    stage("📋 Génération du rapport journal...", 2000),
];

pub const BANK_STAGES: [Stage; 6] = [
    stage("🏦 Lecture des relevés bancaires...", 3000),
    stage("🔍 Rapprochement avec la comptabilité...", 5000),
    stage("🤖 Analyse IA DeepSeek des flux...", 8000),
    stage("⚠️ Détection de mouvements suspects...", 6000),
    stage("📊 Analyse des patterns de flux...", 4000),
    stage("📋 Génération du rapport bancaire...", 3000),
];

/// Stage list for a document kind, or the invoice stages for `None`.
pub fn stages_for(kind: Option<DocumentKind>) -> &'static [Stage] {
    match kind {
        None                        => &INVOICE_STAGES,
        Some(DocumentKind::Fec)     => &FEC_STAGES,
        Some(DocumentKind::Tva)     => &TVA_STAGES,
        Some(DocumentKind::Journal) => &JOURNAL_STAGES,
        Some(DocumentKind::Bank)    => &BANK_STAGES,
    }
}

/// Progress after `completed` of `total` stages.
pub fn progress_after(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let step = 100.0 / total as f64;
    (step * completed as f64).round().min(100.0) as u8
}

#[derive(Debug, Clone)]
pub struct ProgressPipeline {
    scale: f64,
    events: Option<EventBus>,
}

impl ProgressPipeline {
    pub fn new(scale: f64, events: Option<EventBus>) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 0.0 };
        Self { scale, events }
    }

    /// No waiting; stages complete back to back.
    pub fn instant() -> Self {
        Self::new(0.0, None)
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    fn delay(&self, stage: &Stage) -> Duration {
        Duration::from_millis((stage.duration_ms as f64 * self.scale).round() as u64)
    }

    /// Walk `stages` in order and return the progress reached after each.
    pub async fn run(&self, run_id: Uuid, kind: Option<DocumentKind>, stages: &[Stage]) -> Vec<u8> {
        let mut trace = Vec::with_capacity(stages.len());
        for (i, stage) in stages.iter().enumerate() {
            let before = progress_after(i, stages.len());
            self.publish(run_id, kind, i, stage.message, before);

            let delay = self.delay(stage);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            trace.push(progress_after(i + 1, stages.len()));
        }
        if let Some(last) = stages.last() {
            self.publish(run_id, kind, stages.len(), last.message, 100);
        }
        tracing::debug!(%run_id, kind = ?kind, stages = stages.len(), "Pipeline finished");
        trace
    }

    fn publish(&self, run_id: Uuid, kind: Option<DocumentKind>, stage: usize, message: &str, progress: u8) {
        if let Some(events) = &self.events {
            events.emit(AppEvent::AnalysisProgress {
                run_id,
                kind,
                stage,
                message: message.to_string(),
                progress,
            });
        }
    }
}
