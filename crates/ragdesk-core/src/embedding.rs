//! Embedding provider trait, the vector type, and the blob codec.
//!
//! Concrete HTTP providers (OpenAI, Ollama, Gemini) live in the `ragdesk`
//! app crate. This module holds what the pipeline needs to reason about
//! vectors without any network or database dependency.
//!
//! # Blob layout (codec version 1)
//!
//! ```text
//! byte 0      codec version (0x01)
//! bytes 1..5  dimension tag, u32 little-endian
//! bytes 5..   dims × f32 little-endian, natural order
//! ```
//!
//! The dimension tag lets a reader reject a truncated or foreign blob
//! instead of silently reinterpreting it after an embedding-model change.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Current blob codec version written by [`vec_to_blob`].
pub const CODEC_VERSION: u8 = 1;
const HEADER_LEN: usize = 5;

/// A fixed-length embedding. Vectors are compared with cosine similarity,
/// so they need not be pre-normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dims(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Euclidean norm, accumulated in `f64`.
    pub fn norm(&self) -> f64 {
        squared_norm(&self.0).sqrt()
    }

    /// True when the vector has no direction (empty or all zeros).
    pub fn is_degenerate(&self) -> bool {
        self.0.is_empty() || squared_norm(&self.0) == 0.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Trait for embedding providers.
///
/// Implementations call out to an external model and perform no retries;
/// the retriever and the ingestion pipeline decide what a failure means.
/// An unconfigured provider must fail with [`Error::ProviderUnavailable`],
/// anything that went wrong on the wire with [`Error::Provider`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-004"`).
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}

/// Stand-in used when no embedding provider is configured.
///
/// Every call fails with [`Error::ProviderUnavailable`], which routes
/// ingestion to "store without vector" and queries to keyword fallback.
#[derive(Debug, Default, Clone)]
pub struct DisabledEmbedder {
    reason: Option<String>,
}

impl DisabledEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A disabled embedder that remembers why (e.g. a missing API key).
    pub fn because(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
        Err(Error::unavailable(
            self.reason
                .clone()
                .unwrap_or_else(|| "embedding provider is disabled".to_string()),
        ))
    }
}

/// Encode a vector as a versioned, dimension-tagged BLOB.
///
/// # Example
///
/// ```rust
/// use ragdesk_core::embedding::{blob_to_vec, vec_to_blob, EmbeddingVector};
///
/// let v = EmbeddingVector::new(vec![1.0, -2.5, 3.125]);
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 5 + 3 * 4);
/// assert_eq!(blob_to_vec(&blob).unwrap(), v);
/// ```
pub fn vec_to_blob(vec: &EmbeddingVector) -> Vec<u8> {
    let values = vec.as_slice();
    let mut bytes = Vec::with_capacity(HEADER_LEN + values.len() * 4);
    bytes.push(CODEC_VERSION);
    bytes.extend_from_slice(&(values.len() as u32).to_le_bytes());
    for &v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`].
///
/// Fails with [`Error::Codec`] on an unknown version or when the payload
/// length disagrees with the dimension tag.
pub fn blob_to_vec(blob: &[u8]) -> Result<EmbeddingVector> {
    if blob.len() < HEADER_LEN {
        return Err(Error::Codec(format!(
            "blob too short: {} bytes",
            blob.len()
        )));
    }
    if blob[0] != CODEC_VERSION {
        return Err(Error::Codec(format!(
            "unsupported codec version {}",
            blob[0]
        )));
    }
    let dims = u32::from_le_bytes([blob[1], blob[2], blob[3], blob[4]]) as usize;
    let payload = &blob[HEADER_LEN..];
    if payload.len() != dims * 4 {
        return Err(Error::Codec(format!(
            "dimension tag says {} floats but payload holds {} bytes",
            dims,
            payload.len()
        )));
    }
    Ok(EmbeddingVector(
        payload
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    ))
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal, or either vector has zero norm
/// - `-1.0` = opposite direction
///
/// # Errors
///
/// [`Error::DimensionMismatch`] when the lengths differ.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += *x as f64 * *y as f64;
    }

    let norm_a = squared_norm(a);
    let norm_b = squared_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok(sim.clamp(-1.0, 1.0) as f32)
}

fn squared_norm(values: &[f32]) -> f64 {
    values.iter().map(|x| *x as f64 * *x as f64).sum()
}
