//! The question-answering entry point.
//!
//! [`Assistant::ask`] runs retrieval and answer generation for one
//! question, records the exchange in the query log, and returns the answer
//! with short source excerpts. Only a blank question or a storage failure
//! makes it fail.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::answer::{AnswerOutcome, Answerer};
use crate::error::{Error, Result};
use crate::retrieve::{KeywordReason, Retrieval, Retriever};
use crate::store::Store;

/// Longest excerpt returned per source, in chars, including the ellipsis.
pub const EXCERPT_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub document_name: String,
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub latency_ms: u64,
    /// `"vector"` or `"keyword"`.
    pub strategy: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<KeywordReason>,
    pub outcome: AnswerOutcome,
}

pub struct Assistant {
    store: Arc<dyn Store>,
    retriever: Retriever,
    answerer: Answerer,
}

impl Assistant {
    pub fn new(store: Arc<dyn Store>, retriever: Retriever, answerer: Answerer) -> Self {
        Self {
            store,
            retriever,
            answerer,
        }
    }

    pub async fn ask(&self, question: &str) -> Result<AskResponse> {
        let started = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }

        let retrieval = self.retriever.retrieve(question).await?;
        let answer = self.answerer.answer(question, &retrieval).await;

        let latency_ms = started.elapsed().as_millis() as u64;
        self.store
            .append_query_log(question, &answer.text, latency_ms as i64)
            .await?;

        tracing::info!(
            strategy = retrieval.strategy(),
            outcome = ?answer.outcome,
            sources = retrieval.chunks().len(),
            latency_ms,
            "question answered"
        );

        let fallback_reason = match &retrieval {
            Retrieval::Keyword { reason, .. } => Some(*reason),
            Retrieval::Vector(_) => None,
        };

        Ok(AskResponse {
            answer: answer.text,
            sources: retrieval
                .chunks()
                .iter()
                .map(|c| Source {
                    document_name: c.document_name.clone(),
                    excerpt: excerpt(&c.content),
                })
                .collect(),
            latency_ms,
            strategy: retrieval.strategy(),
            fallback_reason,
            outcome: answer.outcome,
        })
    }
}

/// At most [`EXCERPT_CHARS`] chars of `content`, ending in `…` when cut.
pub fn excerpt(content: &str) -> String {
    if content.chars().count() <= EXCERPT_CHARS {
        return content.to_string();
    }
    let mut out: String = content.chars().take(EXCERPT_CHARS - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::AnswerParams;
    use crate::chunk::Chunker;
    use crate::embedding::{DisabledEmbedder, Embedder, EmbeddingVector};
    use crate::ingest::{IngestRequest, IngestionPipeline, PlainTextExtractor};
    use crate::retrieve::RetrievalParams;
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;

    /// Two-axis embedder: "kyc" texts point one way, everything else the other.
    struct AxisEmbedder;

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn model_name(&self) -> &str {
            "axis"
        }

        async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
            let t = text.to_lowercase();
            Ok(EmbeddingVector::new(if t.contains("kyc") {
                vec![1.0, 0.0]
            } else {
                vec![0.0, 1.0]
            }))
        }
    }

    fn assistant(store: Arc<InMemoryStore>, embedder: Arc<dyn Embedder>) -> Assistant {
        Assistant::new(
            store.clone(),
            Retriever::new(store, embedder, RetrievalParams::default()),
            Answerer::new(None, AnswerParams::default()),
        )
    }

    async fn ingest(store: &Arc<InMemoryStore>, embedder: Arc<dyn Embedder>, name: &str, text: &str) {
        IngestionPipeline::new(
            store.clone(),
            embedder,
            Arc::new(PlainTextExtractor),
            Chunker::default(),
        )
        .ingest(IngestRequest::new(name, "text/plain", text.as_bytes().to_vec()))
        .await
        .unwrap();
    }

    #[test]
    fn test_excerpt_limits() {
        assert_eq!(excerpt("short"), "short");
        let exact = "x".repeat(100);
        assert_eq!(excerpt(&exact), exact);
        let long = "é".repeat(150);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), 100);
        assert!(cut.ends_with('…'));
    }

    #[tokio::test]
    async fn test_demo_mode_keyword_answer_is_logged() {
        let store = Arc::new(InMemoryStore::new());
        let embedder: Arc<dyn Embedder> = Arc::new(DisabledEmbedder::new());
        ingest(&store, embedder.clone(), "kyc.txt", "KYC norms require periodic updates of customer records.").await;

        let response = assistant(store.clone(), embedder)
            .ask("KYC requirements?")
            .await
            .unwrap();

        assert_eq!(response.strategy, "keyword");
        assert_eq!(response.fallback_reason, Some(KeywordReason::ProviderUnavailable));
        assert_eq!(response.outcome, AnswerOutcome::Demo);
        assert!(response
            .answer
            .starts_with("[DEMO MODE] Based on the documents in our repository: KYC norms"));
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].document_name, "kyc.txt");

        let log = store.list_query_log(10).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].question, "KYC requirements?");
        assert_eq!(log[0].answer, response.answer);
    }

    #[tokio::test]
    async fn test_vector_answer_prefers_relevant_document() {
        let store = Arc::new(InMemoryStore::new());
        let embedder: Arc<dyn Embedder> = Arc::new(AxisEmbedder);
        ingest(&store, embedder.clone(), "loans.txt", "Priority sector lending targets for banks.").await;
        ingest(&store, embedder.clone(), "kyc.txt", "KYC refresh is due every two years.").await;

        let response = assistant(store, embedder).ask("kyc refresh period").await.unwrap();
        assert_eq!(response.strategy, "vector");
        assert_eq!(response.fallback_reason, None);
        assert_eq!(response.sources[0].document_name, "kyc.txt");
        assert_eq!(response.sources[1].document_name, "loans.txt");
    }

    #[tokio::test]
    async fn test_empty_store_demo_answer() {
        let store = Arc::new(InMemoryStore::new());
        let response = assistant(store, Arc::new(DisabledEmbedder::new()))
            .ask("anything at all")
            .await
            .unwrap();
        assert!(response.sources.is_empty());
        assert!(response.answer.contains("Please try uploading more documents."));
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let err = assistant(store.clone(), Arc::new(DisabledEmbedder::new()))
            .ask("   ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(store.list_query_log(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleted_document_no_longer_answers() {
        let store = Arc::new(InMemoryStore::new());
        let embedder: Arc<dyn Embedder> = Arc::new(DisabledEmbedder::new());
        ingest(&store, embedder.clone(), "kyc.txt", "KYC norms require periodic updates.").await;
        ingest(&store, embedder.clone(), "aml.txt", "AML monitoring of suspicious transactions.").await;

        let kyc_id = store
            .list_documents()
            .await
            .unwrap()
            .into_iter()
            .find(|d| d.name == "kyc.txt")
            .unwrap()
            .id;
        assert!(store.delete_document(kyc_id).await.unwrap());

        let response = assistant(store, embedder).ask("KYC?").await.unwrap();
        // No chunk mentions the token any more; the first remaining chunk is used.
        assert_eq!(response.sources.len(), 1);
        assert_eq!(response.sources[0].document_name, "aml.txt");
    }

    #[tokio::test]
    async fn test_serialized_shape() {
        let store = Arc::new(InMemoryStore::new());
        let response = assistant(store, Arc::new(DisabledEmbedder::new()))
            .ask("hello")
            .await
            .unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("latencyMs").is_some());
        assert_eq!(json["strategy"], "keyword");
        assert_eq!(json["fallbackReason"], "provider_unavailable");
        assert_eq!(json["outcome"], "demo");
        assert!(json.get("embedding").is_none());
    }
}
