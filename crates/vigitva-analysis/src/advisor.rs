//! AI-assisted invoice review with a simulated fallback.
//!
//! When a chat backend is configured the invoice is sent to it and the reply
//! becomes the AI message. Any failure, or the absence of a backend, yields
//! the simulated analysis instead; callers always get a well-formed result.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use vigitva_common::risk::{BASE_RECOMMENDATIONS, MAX_SCORE};
use vigitva_common::RiskLevel;
use vigitva_llm::{AuditLog, LlmAuditEntry, LlmBackend, LlmRequest, Message};

use crate::scorer::INVOICE_CONFIDENCE;

pub const AUDIT_PURPOSE: &str = "analyze-invoice";

pub const SYSTEM_PROMPT: &str = "Vous êtes un expert en détection de fraude TVA dans le secteur BTP. \
Analysez cette facture selon les 6 critères : part de sous-traitance, taille d'entreprise, \
antécédents fiscaux, nombre de fournisseurs, volume de factures, complexité des opérations. \
Répondez en français avec un score de 0-12 points et des recommandations spécifiques.";

pub const SIMULATED_MESSAGE: &str = "Analyse simulée : Cette facture présente des caractéristiques \
normales pour le secteur BTP. (Mode démonstration - API DeepSeek non configurée)";

const EMPTY_REPLY: &str = "Analyse IA DeepSeek terminée";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorAnalysis {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub ai_message: String,
    pub confidence: u8,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceSource {
    Ai,
    Simulated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub analysis: AdvisorAnalysis,
    pub source: AdviceSource,
}

pub fn user_prompt(company_id: &str, supplier_id: &str, invoice_data: &serde_json::Value) -> String {
    format!(
        "Analysez cette facture pour l'entreprise {} et le fournisseur {}. Données: {}",
        company_id, supplier_id, invoice_data
    )
}

pub struct InvoiceAdvisor {
    backend: Option<Arc<dyn LlmBackend>>,
    audit: Arc<AuditLog>,
}

impl InvoiceAdvisor {
    pub fn new(backend: Option<Arc<dyn LlmBackend>>, audit: Arc<AuditLog>) -> Self {
        Self { backend, audit }
    }

    /// Simulation only.
    pub fn offline() -> Self {
        Self::new(None, Arc::new(AuditLog::default()))
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub async fn advise<R: Rng + Send>(
        &self,
        company_id: &str,
        supplier_id: &str,
        invoice_data: &serde_json::Value,
        rng: &mut R,
    ) -> Advice {
        if let Some(backend) = &self.backend {
            if let Some(reply) = self.ask(backend.as_ref(), company_id, supplier_id, invoice_data).await {
                let content = if reply.trim().is_empty() { EMPTY_REPLY } else { reply.as_str() };
                return Advice {
                    analysis: draw(rng, format!("Analyse IA DeepSeek : {}", content)),
                    source: AdviceSource::Ai,
                };
            }
        }
        Advice {
            analysis: draw(rng, SIMULATED_MESSAGE.to_string()),
            source: AdviceSource::Simulated,
        }
    }

    /// The backend's reply, or `None` after logging and auditing the failure.
    async fn ask(
        &self,
        backend: &dyn LlmBackend,
        company_id: &str,
        supplier_id: &str,
        invoice_data: &serde_json::Value,
    ) -> Option<String> {
        let req = LlmRequest {
            messages: vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(user_prompt(company_id, supplier_id, invoice_data)),
            ],
            model: None,
            max_tokens: None,
            temperature: None,
        };

        let started = Instant::now();
        let result = backend.complete(req).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(resp) => {
                self.audit.record(LlmAuditEntry::success(AUDIT_PURPOSE, backend.backend_name(), &resp, latency_ms));
                tracing::info!(model = %resp.model, latency_ms, "Invoice reviewed by LLM");
                Some(resp.content)
            }
            Err(e) => {
                self.audit.record(LlmAuditEntry::failure(
                    AUDIT_PURPOSE,
                    backend.backend_name(),
                    backend.model_id(),
                    &e,
                    latency_ms,
                ));
                tracing::warn!(error = %e, "LLM call failed, falling back to simulation");
                None
            }
        }
    }
}

/// Random score `1..=12` with its level; the AI text does not drive the score.
fn draw<R: Rng>(rng: &mut R, ai_message: String) -> AdvisorAnalysis {
    let risk_score = rng.gen_range(1..=MAX_SCORE);
    AdvisorAnalysis {
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        ai_message,
        confidence: rng.gen_range(INVOICE_CONFIDENCE.0..=INVOICE_CONFIDENCE.1),
        recommendations: BASE_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect(),
    }
}
