//! Core data models shared by the ingestion and retrieval pipeline.
//!
//! Identifiers are store-assigned integers. Timestamps are UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::embedding::EmbeddingVector;

pub const DEFAULT_CATEGORY: &str = "Uncategorized";
pub const DEFAULT_IMPACT: &str = "Low";

/// Lifecycle of an uploaded document.
///
/// A document is created as `Processing` and moves exactly once, to
/// `Ready` after its chunks are persisted or to `Error` when extraction or
/// persistence fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Ready,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Error => "error",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(DocumentStatus::Processing),
            "ready" => Ok(DocumentStatus::Ready),
            "error" => Ok(DocumentStatus::Error),
            other => anyhow::bail!("unknown document status: {}", other),
        }
    }
}

/// Fields supplied by the caller when a document row is created.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub media_type: String,
    pub size_bytes: i64,
    pub category: String,
    pub impact: String,
}

/// A persisted document row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub name: String,
    pub media_type: String,
    pub size_bytes: i64,
    pub status: DocumentStatus,
    pub category: String,
    pub impact: String,
    pub created_at: DateTime<Utc>,
}

/// A chunk about to be written. `embedding` is `None` when the provider
/// was unavailable or failed for this window.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub content: String,
    pub embedding: Option<EmbeddingVector>,
    pub metadata: serde_json::Value,
}

/// A persisted chunk joined with its parent document's display name.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: i64,
    pub document_id: i64,
    pub document_name: String,
    pub content: String,
    pub embedding: Option<EmbeddingVector>,
    pub metadata: serde_json::Value,
}

/// Append-only audit record of one answered question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryLogEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub response_time_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counts for the dashboard / `ragdesk stats`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_documents: i64,
    pub total_chunks: i64,
    pub embedded_chunks: i64,
    pub total_queries: i64,
    pub last_ingested_at: Option<DateTime<Utc>>,
}
