//! Query-time retrieval: vector search with keyword fallback.
//!
//! The [`Retriever`] embeds the question and ranks stored chunk vectors by
//! cosine similarity. Whenever that is impossible it degrades to the
//! substring keyword matcher in [`crate::keyword`] instead of failing:
//!
//! | Condition | Strategy |
//! |-----------|----------|
//! | embedder not configured | keyword, [`KeywordReason::ProviderUnavailable`] |
//! | embedder call failed | keyword, [`KeywordReason::ProviderFailed`] |
//! | no chunk has a vector | keyword, [`KeywordReason::NoStoredVectors`] |
//! | no stored vector has the query's dimensionality | keyword, [`KeywordReason::DimensionMismatch`] |
//! | otherwise | vector top-K |
//!
//! Only storage failures propagate.

use std::sync::Arc;

use serde::Serialize;

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::{top_k, DEFAULT_TOP_K};
use crate::keyword::{keyword_matches, DEFAULT_KEYWORD_LIMIT};
use crate::models::StoredChunk;
use crate::store::Store;

/// Tuning knobs for retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub keyword_limit: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
        }
    }
}

/// A chunk selected for the answer context. Vectors are not carried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub chunk_id: i64,
    pub document_id: i64,
    pub document_name: String,
    pub content: String,
    /// Cosine similarity for vector hits, `None` for keyword matches.
    pub score: Option<f32>,
}

impl RetrievedChunk {
    fn from_stored(chunk: &StoredChunk, score: Option<f32>) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            document_name: chunk.document_name.clone(),
            content: chunk.content.clone(),
            score,
        }
    }
}

/// Why a query was answered from keyword matches instead of vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordReason {
    ProviderUnavailable,
    ProviderFailed,
    NoStoredVectors,
    DimensionMismatch,
}

/// Ranked chunks tagged with the strategy that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Vector(Vec<RetrievedChunk>),
    Keyword {
        reason: KeywordReason,
        chunks: Vec<RetrievedChunk>,
    },
}

impl Retrieval {
    pub fn chunks(&self) -> &[RetrievedChunk] {
        match self {
            Retrieval::Vector(chunks) => chunks,
            Retrieval::Keyword { chunks, .. } => chunks,
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Retrieval::Vector(_) => "vector",
            Retrieval::Keyword { .. } => "keyword",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks().is_empty()
    }
}

pub struct Retriever {
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
    params: RetrievalParams,
}

impl Retriever {
    pub fn new(store: Arc<dyn Store>, embedder: Arc<dyn Embedder>, params: RetrievalParams) -> Self {
        Self {
            store,
            embedder,
            params,
        }
    }

    /// Retrieve context chunks for `question`.
    pub async fn retrieve(&self, question: &str) -> Result<Retrieval> {
        let query = match self.embedder.embed(question).await {
            Ok(vector) => vector,
            Err(e) => {
                let reason = match e {
                    Error::ProviderUnavailable(_) => KeywordReason::ProviderUnavailable,
                    _ => KeywordReason::ProviderFailed,
                };
                tracing::warn!(error = %e, "query embedding failed, using keyword fallback");
                return self.keyword(question, reason).await;
            }
        };

        let stored = self.store.list_chunks_with_vectors().await?;
        if stored.is_empty() {
            tracing::info!("no stored vectors, using keyword fallback");
            return self.keyword(question, KeywordReason::NoStoredVectors).await;
        }

        let ranked = top_k(
            &query,
            stored
                .iter()
                .filter_map(|c| c.embedding.as_ref().map(|v| (c, v))),
            self.params.top_k,
        );

        if ranked.compared == 0 {
            tracing::warn!(
                query_dims = query.dims(),
                mismatched = ranked.mismatched,
                "no stored vector matches the query dimensionality, using keyword fallback"
            );
            return self.keyword(question, KeywordReason::DimensionMismatch).await;
        }
        if ranked.mismatched > 0 {
            tracing::warn!(
                mismatched = ranked.mismatched,
                "skipped stored vectors from a different embedding model"
            );
        }

        tracing::debug!(hits = ranked.hits.len(), compared = ranked.compared, "vector search");
        Ok(Retrieval::Vector(
            ranked
                .hits
                .iter()
                .map(|hit| RetrievedChunk::from_stored(hit.item, Some(hit.score)))
                .collect(),
        ))
    }

    async fn keyword(&self, question: &str, reason: KeywordReason) -> Result<Retrieval> {
        let all = self.store.list_chunks().await?;
        let chunks = keyword_matches(question, &all, |c| c.content.as_str(), self.params.keyword_limit)
            .into_iter()
            .map(|c| RetrievedChunk::from_stored(c, None))
            .collect();
        Ok(Retrieval::Keyword { reason, chunks })
    }
}
