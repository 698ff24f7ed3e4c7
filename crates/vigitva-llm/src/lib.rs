//! vigitva-llm: LLM backend abstraction layer.
//! Implements the LlmBackend trait, the OpenAI-compatible client used for
//! DeepSeek, and the call audit trail.

pub mod audit;
pub mod backend;

pub use audit::{AuditLog, CallOutcome, LlmAuditEntry};
pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message, OpenAiCompatibleBackend};
