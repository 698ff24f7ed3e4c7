//! Shared test fixtures: canned LLM backends, sample entities, seeded RNGs.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use vigitva_common::{NewCompany, NewSupplier, RiskLevel};
use vigitva_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};

pub use pretty_assertions::assert_eq;

/// Deterministic RNG for scoring tests.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

pub fn new_company(name: &str, turnover: f64) -> NewCompany {
    NewCompany {
        name: name.to_string(),
        siret: "12345678901234".to_string(),
        address: "123 Rue de la Construction".to_string(),
        city: "Paris".to_string(),
        postal_code: "75001".to_string(),
        phone: "01 23 45 67 89".to_string(),
        email: "contact@example.fr".to_string(),
        sector: "Gros œuvre".to_string(),
        turnover,
    }
}

pub fn new_supplier(name: &str) -> NewSupplier {
    NewSupplier {
        name: name.to_string(),
        siret: "11111111111111".to_string(),
        address: "789 Zone Industrielle".to_string(),
        city: "Marseille".to_string(),
        postal_code: "13001".to_string(),
        phone: "04 91 23 45 67".to_string(),
        email: "vente@example.fr".to_string(),
        speciality: "Matériaux de construction".to_string(),
        risk_level: RiskLevel::Faible,
    }
}

/// Always answers with the same content and remembers what it was asked.
pub struct CannedBackend {
    content: String,
    calls: AtomicUsize,
    last_request: Mutex<Option<LlmRequest>>,
}

impl CannedBackend {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into(), calls: AtomicUsize::new(0), last_request: Mutex::new(None) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<LlmRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for CannedBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(req);
        Ok(LlmResponse {
            content: self.content.clone(),
            model: "canned".to_string(),
            prompt_tokens: 42,
            completion_tokens: 7,
        })
    }

    fn model_id(&self) -> &str { "canned" }
    fn backend_name(&self) -> &str { "canned" }
}

/// Fails every call with an upstream error.
pub struct FailingBackend {
    pub status: u16,
}

impl Default for FailingBackend {
    fn default() -> Self {
        Self { status: 503 }
    }
}

#[async_trait]
impl LlmBackend for FailingBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::ApiError { status: self.status, message: "upstream down".to_string() })
    }

    fn model_id(&self) -> &str { "failing" }
    fn backend_name(&self) -> &str { "failing" }
}
