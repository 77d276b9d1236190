//! Summarization client: one prompt in, one raw summary out.
//!
//! Prompt wording lives in [`crate::prompts`] and output cleanup in
//! [`crate::pipeline::postprocess`]. This module holds the wire format of
//! each provider and the mapping of HTTP failures onto [`ProviderError`].
//!
//! ## Provider request shapes
//!
//! | Provider | Endpoint | Auth | Body |
//! |----------|----------|------|------|
//! | Gemini | `POST {base}/v1beta/models/{model}:generateContent` | `x-goog-api-key` | one `contents` entry holding the whole prompt |
//! | OpenAI | `POST {base}/v1/chat/completions` | `Authorization: Bearer` | `model` + `[system, user]` messages |
//!
//! No retry happens here: a single attempt, surfaced to the caller.

use crate::error::{ProviderError, SummarizeError};
use crate::prompts::SUMMARY_SYSTEM_PROMPT;
use crate::settings::{Provider, ProviderConfig};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Gemini API root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default OpenAI API root. Any OpenAI-compatible host works as an override.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Send one prompt to a provider and return its raw answer.
#[async_trait]
pub trait SummaryClient: Send + Sync {
    async fn summarize(&self, prompt: &str, provider: &ProviderConfig)
        -> Result<String, ProviderError>;

    /// Whether `ProviderConfig::api_key` must be set before calling.
    fn requires_api_key(&self) -> bool {
        true
    }
}

// ── Native HTTP client ───────────────────────────────────────────────────

/// Talks to Gemini and OpenAI-compatible endpoints over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpSummaryClient {
    http: reqwest::Client,
}

impl HttpSummaryClient {
    /// Build a client. `timeout` of `None` leaves calls unbounded.
    pub fn new(timeout: Option<Duration>) -> Result<Self, SummarizeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder
            .build()
            .map_err(|e| SummarizeError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { http })
    }

    async fn call_gemini(&self, prompt: &str, cfg: &ProviderConfig) -> Result<String, ProviderError> {
        let base = cfg
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_BASE_URL)
            .trim_end_matches('/');
        let url = format!("{base}/v1beta/models/{}:generateContent", cfg.model);

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(Provider::Gemini, &e))?;

        let json = read_json(resp, Provider::Gemini).await?;
        gemini_text(&json).ok_or_else(|| ProviderError::Malformed {
            provider: Provider::Gemini.to_string(),
            detail: match json["promptFeedback"]["blockReason"].as_str() {
                Some(reason) => format!("prompt blocked: {reason}"),
                None => "response has no candidate text".to_string(),
            },
        })
    }

    async fn call_openai(&self, prompt: &str, cfg: &ProviderConfig) -> Result<String, ProviderError> {
        let base = cfg
            .base_url
            .as_deref()
            .unwrap_or(OPENAI_BASE_URL)
            .trim_end_matches('/');
        let url = format!("{base}/v1/chat/completions");

        let body = json!({
            "model": cfg.model,
            "messages": [
                { "role": "system", "content": SUMMARY_SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ]
        });

        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(&cfg.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(Provider::OpenAi, &e))?;

        let json = read_json(resp, Provider::OpenAi).await?;
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Malformed {
                provider: Provider::OpenAi.to_string(),
                detail: "response has no choices[0].message.content".to_string(),
            })
    }
}

#[async_trait]
impl SummaryClient for HttpSummaryClient {
    async fn summarize(
        &self,
        prompt: &str,
        provider: &ProviderConfig,
    ) -> Result<String, ProviderError> {
        debug!(
            "Calling {} ({}) with {} prompt chars",
            provider.provider,
            provider.model,
            prompt.len()
        );
        match provider.provider {
            Provider::Gemini => self.call_gemini(prompt, provider).await,
            Provider::OpenAi => self.call_openai(prompt, provider).await,
        }
    }
}

/// Concatenate `candidates[0].content.parts[*].text`.
fn gemini_text(json: &Value) -> Option<String> {
    let parts = json["candidates"]
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|c| c["content"]["parts"].as_array())?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn network_error(provider: Provider, e: &reqwest::Error) -> ProviderError {
    let detail = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    };
    ProviderError::Network {
        provider: provider.to_string(),
        detail,
    }
}

/// Parse a success body, or classify a failure status.
async fn read_json(resp: reqwest::Response, provider: Provider) -> Result<Value, ProviderError> {
    let status = resp.status();

    if status.is_success() {
        return resp.json::<Value>().await.map_err(|e| ProviderError::Malformed {
            provider: provider.to_string(),
            detail: e.to_string(),
        });
    }

    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = resp.text().await.unwrap_or_default();

    warn!("{} returned HTTP {}", provider, status.as_u16());
    Err(classify_status(
        provider.as_str(),
        status.as_u16(),
        retry_after,
        &body,
    ))
}

/// Map a non-success HTTP status and body onto a [`ProviderError`].
pub fn classify_status(
    provider: &str,
    status: u16,
    retry_after_secs: Option<u64>,
    body: &str,
) -> ProviderError {
    let message = || body_error_message(body).unwrap_or_else(|| status_text(status));
    match status {
        429 => ProviderError::RateLimited {
            provider: provider.to_string(),
            retry_after_secs,
        },
        401 | 403 => ProviderError::Unauthorized {
            provider: provider.to_string(),
            status,
            detail: message(),
        },
        _ => ProviderError::Unknown {
            provider: provider.to_string(),
            status: Some(status),
            message: message(),
        },
    }
}

/// Most specific message in a provider error body.
///
/// Understands `{"error":{"message":…}}` (Gemini, OpenAI),
/// `{"error":"…"}` and `{"message":"…"}`.
fn body_error_message(body: &str) -> Option<String> {
    let v: Value = serde_json::from_str(body).ok()?;
    v["error"]["message"]
        .as_str()
        .or_else(|| v["error"].as_str())
        .or_else(|| v["message"].as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// e.g. `"502 Bad Gateway"`.
fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(|reason| format!("{status} {reason}"))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Summarize through any [`LLMProvider`] (OpenAI, Anthropic, Ollama, …).
///
/// The provider carries its own credentials, so `ProviderConfig` is only
/// used for logging.
pub struct LlmProviderClient {
    provider: Arc<dyn LLMProvider>,
    label: String,
    options: CompletionOptions,
}

impl LlmProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
            options: CompletionOptions {
                temperature: Some(0.3),
                max_tokens: Some(2048),
                ..Default::default()
            },
        }
    }

    /// Create via [`ProviderFactory`], which reads the provider's API key
    /// from its environment variable.
    pub fn from_provider_name(name: &str, model: &str) -> Result<Self, SummarizeError> {
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            SummarizeError::InvalidConfig(format!("LLM provider '{name}' is not configured: {e}"))
        })?;
        Ok(Self::new(provider, name))
    }
}

#[async_trait]
impl SummaryClient for LlmProviderClient {
    async fn summarize(
        &self,
        prompt: &str,
        provider: &ProviderConfig,
    ) -> Result<String, ProviderError> {
        debug!("Calling {} via edgequake-llm (settings: {:?})", self.label, provider);
        let messages = vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        let response = self
            .provider
            .chat(&messages, Some(&self.options))
            .await
            .map_err(|e| ProviderError::Unknown {
                provider: self.label.clone(),
                status: None,
                message: e.to_string(),
            })?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    fn requires_api_key(&self) -> bool {
        false
    }
}
