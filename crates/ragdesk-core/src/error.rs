//! Error taxonomy for the retrieval pipeline.
//!
//! Only [`Error::Extraction`], [`Error::InvalidRequest`] and
//! [`Error::Storage`] are meant to reach a caller of the two public
//! operations (`ingest` and `ask`). Provider failures are consumed by the
//! fallback paths in [`retrieve`](crate::retrieve) and
//! [`answer`](crate::answer).

use thiserror::Error;

/// Result alias used across the core crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The document could not be turned into plain text.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// No provider is configured, or its credentials are missing.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider was reachable but failed (network, timeout, quota, bad request).
    #[error("provider error: {0}")]
    Provider(String),

    /// Two vectors from different embedding models were compared.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A stored vector blob could not be decoded.
    #[error("vector codec: {0}")]
    Codec(String),

    /// The caller passed something unusable (blank question, bad chunk window).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl Error {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable(message.into())
    }

    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// True for the two provider conditions that trigger a fallback path.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::Provider(_))
    }
}
