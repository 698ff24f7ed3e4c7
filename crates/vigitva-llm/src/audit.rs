//! Audit trail for LLM calls.
//! Outputs are never stored, only their SHA-256.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

use crate::backend::{LlmError, LlmResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallOutcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAuditEntry {
    pub id: Uuid,
    /// What the call was for, e.g. `analyze-invoice`.
    pub purpose: String,
    pub model: String,
    pub backend: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub outcome: CallOutcome,
    pub output_hash: Option<String>,
    pub error: Option<String>,
    pub latency_ms: u64,
    pub called_at: chrono::DateTime<Utc>,
}

pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl LlmAuditEntry {
    pub fn success(purpose: &str, backend: &str, resp: &LlmResponse, latency_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            purpose: purpose.to_string(),
            model: resp.model.clone(),
            backend: backend.to_string(),
            prompt_tokens: resp.prompt_tokens,
            completion_tokens: resp.completion_tokens,
            outcome: CallOutcome::Success,
            output_hash: Some(sha256_hex(&resp.content)),
            error: None,
            latency_ms,
            called_at: Utc::now(),
        }
    }

    pub fn failure(purpose: &str, backend: &str, model: &str, err: &LlmError, latency_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            purpose: purpose.to_string(),
            model: model.to_string(),
            backend: backend.to_string(),
            prompt_tokens: 0,
            completion_tokens: 0,
            outcome: CallOutcome::Failed,
            output_hash: None,
            error: Some(err.to_string()),
            latency_ms,
            called_at: Utc::now(),
        }
    }
}

/// Bounded in-memory log; the oldest entry is dropped when full.
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<LlmAuditEntry>>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self { capacity: capacity.max(1), entries: Mutex::new(VecDeque::new()) }
    }

    pub fn record(&self, entry: LlmAuditEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<LlmAuditEntry> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.iter().rev().cloned().collect()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(100)
    }
}
