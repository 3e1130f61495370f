//! HTTP embedding providers.
//!
//! Implements [`ragdesk_core::embedding::Embedder`] for:
//! - **[`OpenAIEmbedder`]**: `POST /v1/embeddings`
//! - **[`OllamaEmbedder`]**: `POST /api/embed` on a local Ollama instance
//! - **[`GeminiEmbedder`]**: `POST /v1beta/models/{model}:embedContent`
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to instantiate the provider named in the
//! configuration. A hosted provider whose API key is missing from the
//! environment is replaced by a [`DisabledEmbedder`], so the service still
//! starts and answers from keyword matches.
//!
//! ```rust,no_run
//! # use ragdesk::config::EmbeddingConfig;
//! # use ragdesk::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```
//!
//! # Failures
//!
//! Providers never retry. Every request carries the configured timeout;
//! network errors, timeouts and non-2xx responses all surface as
//! [`Error::Provider`] and the caller decides how to degrade.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use ragdesk_core::embedding::{DisabledEmbedder, Embedder, EmbeddingVector};
use ragdesk_core::error::{Error, Result};

use crate::config::EmbeddingConfig;

pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";

pub const OPENAI_URL: &str = "https://api.openai.com";
pub const OLLAMA_URL: &str = "http://localhost:11434";
pub const GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Build the embedder named by `config.provider`.
///
/// # Errors
///
/// Unknown provider names, a missing model, or an HTTP client that cannot
/// be built. A missing API key is not an error.
pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn Embedder>> {
    let model = || {
        config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for provider '{}'", config.provider))
    };

    if !config.is_enabled() {
        return Ok(Arc::new(DisabledEmbedder::new()));
    }

    match config.provider.as_str() {
        "openai" => match api_key(OPENAI_KEY_VAR) {
            Some(key) => Ok(Arc::new(OpenAIEmbedder::new(
                http_client(config.timeout_secs)?,
                base_url(config.url.as_deref(), OPENAI_URL),
                model()?,
                key,
            ))),
            None => Ok(Arc::new(missing_key(OPENAI_KEY_VAR))),
        },
        "ollama" => Ok(Arc::new(OllamaEmbedder::new(
            http_client(config.timeout_secs)?,
            base_url(config.url.as_deref(), OLLAMA_URL),
            model()?,
        ))),
        "gemini" => match api_key(GEMINI_KEY_VAR) {
            Some(key) => Ok(Arc::new(GeminiEmbedder::new(
                http_client(config.timeout_secs)?,
                base_url(config.url.as_deref(), GEMINI_URL),
                model()?,
                key,
            ))),
            None => Ok(Arc::new(missing_key(GEMINI_KEY_VAR))),
        },
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}

fn missing_key(var: &str) -> DisabledEmbedder {
    tracing::warn!("{} not set, embeddings disabled; questions will use keyword matching", var);
    DisabledEmbedder::because(format!("{} not set", var))
}

// ============ Shared HTTP plumbing ============

/// Non-empty API key from the environment.
pub(crate) fn api_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|k| !k.trim().is_empty())
}

pub(crate) fn base_url(configured: Option<&str>, default: &str) -> String {
    configured.unwrap_or(default).trim_end_matches('/').to_string()
}

pub(crate) fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a request and decode a JSON body. Any failure is a provider error.
pub(crate) async fn send_json(
    request: reqwest::RequestBuilder,
    provider: &str,
) -> Result<serde_json::Value> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            Error::provider(format!("{} request timed out", provider))
        } else {
            Error::provider(format!("{} connection error: {}", provider, e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(Error::provider(format!(
            "{} API error {}: {}",
            provider, status, body_text
        )));
    }

    response
        .json()
        .await
        .map_err(|e| Error::provider(format!("{} returned invalid JSON: {}", provider, e)))
}

fn floats(values: &serde_json::Value, what: &str) -> Result<EmbeddingVector> {
    let array = values
        .as_array()
        .ok_or_else(|| Error::provider(format!("Invalid {} response: embedding is not an array", what)))?;
    let vec: Vec<f32> = array
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();
    if vec.is_empty() {
        return Err(Error::provider(format!("Invalid {} response: empty embedding", what)));
    }
    Ok(EmbeddingVector::new(vec))
}

// ============ OpenAI ============

pub struct OpenAIEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl OpenAIEmbedder {
    pub fn new(client: reqwest::Client, url: String, model: String, api_key: String) -> Self {
        Self {
            client,
            url,
            model,
            api_key,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let json = send_json(
            self.client
                .post(format!("{}/v1/embeddings", self.url))
                .bearer_auth(&self.api_key)
                .json(&body),
            "OpenAI",
        )
        .await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[0].embedding`.
fn parse_openai_response(json: &serde_json::Value) -> Result<EmbeddingVector> {
    let first = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .ok_or_else(|| Error::provider("Invalid OpenAI response: missing data array"))?;
    let embedding = first
        .get("embedding")
        .ok_or_else(|| Error::provider("Invalid OpenAI response: missing embedding"))?;
    floats(embedding, "OpenAI")
}

// ============ Ollama ============

pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: reqwest::Client, url: String, model: String) -> Self {
        Self { client, url, model }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });
        let json = send_json(
            self.client
                .post(format!("{}/api/embed", self.url))
                .json(&body),
            "Ollama",
        )
        .await?;
        parse_ollama_response(&json)
    }
}

/// Extract `embeddings[0]`.
fn parse_ollama_response(json: &serde_json::Value) -> Result<EmbeddingVector> {
    let first = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .ok_or_else(|| Error::provider("Invalid Ollama response: missing embeddings array"))?;
    floats(first, "Ollama")
}

// ============ Gemini ============

pub struct GeminiEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl GeminiEmbedder {
    pub fn new(client: reqwest::Client, url: String, model: String, api_key: String) -> Self {
        Self {
            client,
            url,
            model,
            api_key,
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let body = serde_json::json!({
            "content": { "parts": [{ "text": text }] },
        });
        let json = send_json(
            self.client
                .post(format!(
                    "{}/v1beta/models/{}:embedContent",
                    self.url, self.model
                ))
                .header("x-goog-api-key", &self.api_key)
                .json(&body),
            "Gemini",
        )
        .await?;
        parse_gemini_response(&json)
    }
}

/// Extract `embedding.values`.
fn parse_gemini_response(json: &serde_json::Value) -> Result<EmbeddingVector> {
    let values = json
        .get("embedding")
        .and_then(|e| e.get("values"))
        .ok_or_else(|| Error::provider("Invalid Gemini response: missing embedding.values"))?;
    floats(values, "Gemini")
}
