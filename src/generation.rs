//! HTTP text-generation providers.
//!
//! Implements [`ragdesk_core::answer::Generator`] for OpenAI chat
//! completions, Ollama `/api/generate` and Gemini `generateContent`.
//! [`create_generator`] returns `None` when generation is disabled or the
//! provider's API key is missing; the answerer then runs in demo mode.

use async_trait::async_trait;
use std::sync::Arc;

use ragdesk_core::answer::Generator;
use ragdesk_core::error::{Error, Result};

use crate::config::GenerationConfig;
use crate::embedding::{
    api_key, base_url, http_client, send_json, GEMINI_KEY_VAR, GEMINI_URL, OLLAMA_URL,
    OPENAI_KEY_VAR, OPENAI_URL,
};

pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Option<Arc<dyn Generator>>> {
    if !config.is_enabled() {
        return Ok(None);
    }

    let model = config.model.clone().ok_or_else(|| {
        anyhow::anyhow!("generation.model required for provider '{}'", config.provider)
    })?;
    let client = http_client(config.timeout_secs)?;

    let generator: Arc<dyn Generator> = match config.provider.as_str() {
        "openai" => match api_key(OPENAI_KEY_VAR) {
            Some(key) => Arc::new(OpenAIGenerator {
                client,
                url: base_url(config.url.as_deref(), OPENAI_URL),
                model,
                api_key: key,
            }),
            None => return Ok(missing_key(OPENAI_KEY_VAR)),
        },
        "ollama" => Arc::new(OllamaGenerator {
            client,
            url: base_url(config.url.as_deref(), OLLAMA_URL),
            model,
        }),
        "gemini" => match api_key(GEMINI_KEY_VAR) {
            Some(key) => Arc::new(GeminiGenerator {
                client,
                url: base_url(config.url.as_deref(), GEMINI_URL),
                model,
                api_key: key,
            }),
            None => return Ok(missing_key(GEMINI_KEY_VAR)),
        },
        other => anyhow::bail!("Unknown generation provider: {}", other),
    };

    Ok(Some(generator))
}

fn missing_key(var: &str) -> Option<Arc<dyn Generator>> {
    tracing::warn!("{} not set, answers will be returned in demo mode", var);
    None
}

fn non_empty(text: Option<&str>, provider: &str) -> Result<String> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(Error::provider(format!("{} returned an empty answer", provider))),
    }
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = send_json(
            self.client
                .post(format!("{}/v1/chat/completions", self.url))
                .bearer_auth(&self.api_key)
                .json(&body),
            "OpenAI",
        )
        .await?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &serde_json::Value) -> Result<String> {
    let text = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str());
    non_empty(text, "OpenAI")
}

// ============ Ollama ============

pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let json = send_json(
            self.client
                .post(format!("{}/api/generate", self.url))
                .json(&body),
            "Ollama",
        )
        .await?;
        non_empty(json.get("response").and_then(|r| r.as_str()), "Ollama")
    }
}

// ============ Gemini ============

pub struct GeminiGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        let json = send_json(
            self.client
                .post(format!(
                    "{}/v1beta/models/{}:generateContent",
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

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &serde_json::Value) -> Result<String> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());
    let text = parts.map(|parts| {
        parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<String>()
    });
    non_empty(text.as_deref(), "Gemini")
}
