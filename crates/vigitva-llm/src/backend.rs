//! LLM backend trait and the chat-completion client.
//!
//! Backends:
//!   OpenAiCompatibleBackend: any OpenAI-compatible `/v1/chat/completions`
//!                             endpoint; DeepSeek is the default target.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use vigitva_config::LlmConfig;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    /// Short provider name recorded in the audit trail.
    fn backend_name(&self) -> &str;
}

// ── Helper: parse OpenAI-style response ──────────────────────────────────────

pub(crate) fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body: serde_json::Value = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(_) if status >= 400 => serde_json::Value::Null,
        Err(e) => return Err(e.into()),
    };
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

// ── OpenAI-compatible (DeepSeek, …) ──────────────────────────────────────────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            max_tokens: 500,
            temperature: 0.3,
            api_key,
            client,
        })
    }

    /// Build from configuration. `None` when no API key is available, so
    /// callers run in simulation mode.
    pub fn from_config(cfg: &LlmConfig) -> Result<Option<Self>, LlmError> {
        let Some(key) = cfg.resolve_api_key() else {
            tracing::info!(env = %cfg.api_key_env, "No LLM API key configured, AI calls disabled");
            return Ok(None);
        };
        let mut backend = Self::new(
            cfg.base_url.clone(),
            cfg.model.clone(),
            Some(key),
            Duration::from_secs(cfg.timeout_secs),
        )?;
        backend.max_tokens = cfg.max_tokens;
        backend.temperature = cfg.temperature;
        Ok(Some(backend))
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k.expose_secret()),
            None    => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = serde_json::json!({
            "model":       req.model.as_deref().unwrap_or(&self.model),
            "messages":    req.messages,
            "max_tokens":  req.max_tokens.unwrap_or(self.max_tokens),
            "temperature": req.temperature.unwrap_or(self.temperature),
        });
        let resp = self.auth(self.client.post(&url)).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn backend_name(&self) -> &str { "openai-compatible" }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server answering every request with `status` and `body`.
    async fn canned_server(status: u16, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut sock, _)) = listener.accept().await {
                let mut buf = vec![0u8; 16 * 1024];
                let _ = sock.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = sock.write_all(resp.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    fn request() -> LlmRequest {
        LlmRequest {
            messages: vec![Message::system("Expert TVA"), Message::user("Analysez cette facture")],
            model: None,
            max_tokens: None,
            temperature: None,
        }
    }

    #[test]
    fn test_parse_openai_response_reads_content_and_usage() {
        let json = serde_json::json!({
            "model": "deepseek-chat",
            "choices": [{"message": {"content": "Risque modéré"}}],
            "usage": {"prompt_tokens": 120, "completion_tokens": 40}
        });
        let r = parse_openai_response(&json, "fallback");
        assert_eq!(r.content, "Risque modéré");
        assert_eq!(r.model, "deepseek-chat");
        assert_eq!((r.prompt_tokens, r.completion_tokens), (120, 40));
    }

    #[test]
    fn test_parse_openai_response_tolerates_missing_fields() {
        let r = parse_openai_response(&serde_json::json!({}), "deepseek-chat");
        assert_eq!(r.content, "");
        assert_eq!(r.model, "deepseek-chat");
    }

    #[test]
    fn test_from_config_without_key_is_none() {
        let cfg = LlmConfig { api_key_env: "VIGITVA_TEST_UNSET_KEY_9431".into(), ..Default::default() };
        assert!(OpenAiCompatibleBackend::from_config(&cfg).unwrap().is_none());
    }

    #[test]
    fn test_from_config_with_inline_key() {
        let cfg = LlmConfig {
            api_key: Some("sk-test".into()),
            api_key_env: "VIGITVA_TEST_UNSET_KEY_9432".into(),
            max_tokens: 250,
            ..Default::default()
        };
        let b = OpenAiCompatibleBackend::from_config(&cfg).unwrap().unwrap();
        assert_eq!(b.model_id(), "deepseek-chat");
        assert_eq!(b.max_tokens, 250);
    }

    #[tokio::test]
    async fn test_complete_success() {
        let url = canned_server(
            200,
            r#"{"model":"deepseek-chat","choices":[{"message":{"content":"Score 7/12"}}]}"#,
        )
        .await;
        let b = OpenAiCompatibleBackend::new(url, "deepseek-chat", Some("k".to_string().into()), Duration::from_secs(5)).unwrap();
        let r = b.complete(request()).await.unwrap();
        assert_eq!(r.content, "Score 7/12");
    }

    #[tokio::test]
    async fn test_complete_maps_error_status() {
        let url = canned_server(401, r#"{"error":{"message":"Invalid API key"}}"#).await;
        let b = OpenAiCompatibleBackend::new(url, "deepseek-chat", None, Duration::from_secs(5)).unwrap();
        match b.complete(request()).await {
            Err(LlmError::ApiError { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("expected ApiError, got {:?}", other.map(|r| r.content)),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let b = OpenAiCompatibleBackend::new("http://127.0.0.1:9", "deepseek-chat", None, Duration::from_secs(2)).unwrap();
        assert!(matches!(b.complete(request()).await, Err(LlmError::Http(_))));
    }
}
