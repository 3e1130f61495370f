//! TOML configuration.
//!
//! API keys are never read from the file. Providers look them up in the
//! environment (`OPENAI_API_KEY`, `GEMINI_API_KEY`) when they are built.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use ragdesk_core::answer::{DEFAULT_MAX_CONTEXT_CHARS, DEFAULT_PREAMBLE};
use ragdesk_core::chunk::{DEFAULT_CHUNK_CHARS, DEFAULT_MIN_CHARS, DEFAULT_OVERLAP_CHARS};
use ragdesk_core::index::DEFAULT_TOP_K;
use ragdesk_core::keyword::DEFAULT_KEYWORD_LIMIT;

pub const PROVIDERS: &[&str] = &["disabled", "openai", "ollama", "gemini"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_chars: DEFAULT_CHUNK_CHARS,
            overlap_chars: DEFAULT_OVERLAP_CHARS,
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

fn default_chunk_chars() -> usize {
    DEFAULT_CHUNK_CHARS
}
fn default_overlap_chars() -> usize {
    DEFAULT_OVERLAP_CHARS
}
fn default_min_chars() -> usize {
    DEFAULT_MIN_CHARS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_keyword_limit")]
    pub keyword_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
        }
    }
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}
fn default_keyword_limit() -> usize {
    DEFAULT_KEYWORD_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override (Ollama host, OpenAI-compatible gateway).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_preamble")]
    pub preamble: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            timeout_secs: default_generation_timeout_secs(),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            preamble: default_preamble(),
        }
    }
}

impl GenerationConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_generation_timeout_secs() -> u64 {
    60
}
fn default_max_context_chars() -> usize {
    DEFAULT_MAX_CONTEXT_CHARS
}
fn default_preamble() -> String {
    DEFAULT_PREAMBLE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest accepted upload body, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}
fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Chunking
    if config.chunking.chunk_chars == 0 {
        anyhow::bail!("chunking.chunk_chars must be > 0");
    }
    if config.chunking.overlap_chars >= config.chunking.chunk_chars {
        anyhow::bail!("chunking.overlap_chars must be smaller than chunking.chunk_chars");
    }

    // Retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.keyword_limit < 1 {
        anyhow::bail!("retrieval.keyword_limit must be >= 1");
    }

    // Providers
    for (section, provider, model) in [
        (
            "embedding",
            &config.embedding.provider,
            &config.embedding.model,
        ),
        (
            "generation",
            &config.generation.provider,
            &config.generation.model,
        ),
    ] {
        if !PROVIDERS.contains(&provider.as_str()) {
            anyhow::bail!(
                "Unknown {} provider: '{}'. Must be one of: {}.",
                section,
                provider,
                PROVIDERS.join(", ")
            );
        }
        if provider != "disabled" && model.is_none() {
            anyhow::bail!(
                "{}.model must be specified when provider is '{}'",
                section,
                provider
            );
        }
    }

    if config.generation.max_context_chars == 0 {
        anyhow::bail!("generation.max_context_chars must be > 0");
    }

    Ok(())
}
