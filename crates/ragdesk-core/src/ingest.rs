//! Document ingestion pipeline.
//!
//! One call to [`IngestionPipeline::ingest`] processes one uploaded
//! document end to end:
//!
//! ```text
//! insert document (processing)
//!   → extract text          (failure: status = error, Error::Extraction)
//!   → chunk
//!   → embed each chunk      (failure: chunk stored without a vector)
//!   → insert_chunks         (failure: status = error, Error::Storage)
//!   → status = ready
//! ```
//!
//! All chunks of a document are written in one `insert_chunks` call, so a
//! reader sees either none of them or all of them.

use async_trait::async_trait;
use std::sync::Arc;

use serde::Serialize;

use crate::chunk::Chunker;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::models::{DocumentStatus, NewChunk, NewDocument, DEFAULT_CATEGORY, DEFAULT_IMPACT};
use crate::store::Store;

/// Turns raw upload bytes into plain text.
///
/// Async so implementations that parse large binary formats can move the
/// work off the runtime's worker threads.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text from `bytes` according to `media_type`.
    ///
    /// Fails with [`Error::Extraction`] when the payload cannot be read.
    async fn extract(&self, bytes: &[u8], media_type: &str) -> Result<String>;
}

/// Decodes every payload as UTF-8, replacing invalid sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8], _media_type: &str) -> Result<String> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// One uploaded document.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub name: String,
    pub category: Option<String>,
    pub impact: Option<String>,
}

impl IngestRequest {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            name: name.into(),
            category: None,
            impact: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = Some(impact.into());
        self
    }
}

/// What one ingestion produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub document_id: i64,
    /// Chunks persisted.
    pub chunks: usize,
    /// Chunks persisted with a vector.
    pub embedded: usize,
}

pub struct IngestionPipeline {
    store: Arc<dyn Store>,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn TextExtractor>,
    chunker: Chunker,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn Store>,
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn TextExtractor>,
        chunker: Chunker,
    ) -> Self {
        Self {
            store,
            embedder,
            extractor,
            chunker,
        }
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReport> {
        let document_id = self
            .store
            .insert_document(&NewDocument {
                name: request.name.clone(),
                media_type: request.media_type.clone(),
                size_bytes: request.bytes.len() as i64,
                category: non_blank_or(request.category.as_deref(), DEFAULT_CATEGORY),
                impact: non_blank_or(request.impact.as_deref(), DEFAULT_IMPACT),
            })
            .await?;

        let text = match self
            .extractor
            .extract(&request.bytes, &request.media_type)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                let e = match e {
                    Error::Extraction(_) => e,
                    other => Error::extraction(other.to_string()),
                };
                tracing::warn!(document_id, name = %request.name, error = %e, "extraction failed");
                self.mark_failed(document_id).await;
                return Err(e);
            }
        };

        let chunks = self.embed_chunks(&text).await;
        let embedded = chunks.iter().filter(|c| c.embedding.is_some()).count();

        if let Err(e) = self.store.insert_chunks(document_id, &chunks).await {
            tracing::error!(document_id, error = %e, "failed to persist chunks");
            self.mark_failed(document_id).await;
            return Err(Error::Storage(e));
        }

        self.store
            .set_document_status(document_id, DocumentStatus::Ready)
            .await?;

        tracing::info!(
            document_id,
            name = %request.name,
            chunks = chunks.len(),
            embedded,
            "document ingested"
        );

        Ok(IngestReport {
            document_id,
            chunks: chunks.len(),
            embedded,
        })
    }

    /// Chunk `text` and try to embed every window. Once the provider reports
    /// itself unavailable the remaining windows are stored without calling it.
    async fn embed_chunks(&self, text: &str) -> Vec<NewChunk> {
        let mut provider_down = false;
        let mut chunks = Vec::new();

        for window in self.chunker.chunks(text) {
            let embedding = if provider_down {
                None
            } else {
                match self.embedder.embed(window.text).await {
                    Ok(vector) => Some(vector),
                    Err(Error::ProviderUnavailable(reason)) => {
                        tracing::warn!(%reason, "embedding provider unavailable, storing chunks without vectors");
                        provider_down = true;
                        None
                    }
                    Err(e) => {
                        tracing::warn!(window = window.index, error = %e, "chunk embedding failed");
                        None
                    }
                }
            };

            chunks.push(NewChunk {
                content: window.text.to_string(),
                embedding,
                metadata: window.metadata(),
            });
        }

        chunks
    }

    async fn mark_failed(&self, document_id: i64) {
        if let Err(e) = self
            .store
            .set_document_status(document_id, DocumentStatus::Error)
            .await
        {
            tracing::error!(document_id, error = %e, "failed to mark document as errored");
        }
    }
}

fn non_blank_or(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{DisabledEmbedder, EmbeddingVector};
    use crate::models::{Document, QueryLogEntry, StoreStats, StoredChunk};
    use crate::store::memory::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds by text length; counts calls.
    struct CountingEmbedder {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on: None,
            }
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }

        async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(n) {
                return Err(Error::provider("HTTP 500"));
            }
            Ok(EmbeddingVector::new(vec![text.len() as f32, 1.0]))
        }
    }

    /// Counts calls and always reports itself unconfigured.
    #[derive(Default)]
    struct CountingDisabled {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingDisabled {
        fn model_name(&self) -> &str {
            "disabled"
        }

        async fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::unavailable("no key"))
        }
    }

    struct RejectingExtractor;

    #[async_trait]
    impl TextExtractor for RejectingExtractor {
        async fn extract(&self, _bytes: &[u8], media_type: &str) -> Result<String> {
            Err(Error::extraction(format!("cannot read {}", media_type)))
        }
    }

    fn pipeline(store: Arc<dyn Store>, embedder: Arc<dyn Embedder>) -> IngestionPipeline {
        IngestionPipeline::new(store, embedder, Arc::new(PlainTextExtractor), Chunker::default())
    }

    fn text_of(chars: usize) -> Vec<u8> {
        (0..chars)
            .map(|i| if i % 7 == 6 { b' ' } else { b'a' + (i % 26) as u8 })
            .collect()
    }

    #[tokio::test]
    async fn test_ingest_2500_chars() {
        let store = Arc::new(InMemoryStore::new());
        let embedder = Arc::new(CountingEmbedder::new());
        let report = pipeline(store.clone(), embedder.clone())
            .ingest(IngestRequest::new("circular.txt", "text/plain", text_of(2500)))
            .await
            .unwrap();

        assert_eq!(report.chunks, 4);
        assert_eq!(report.embedded, 4);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);

        let doc = store.get_document(report.document_id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Ready);
        assert_eq!(doc.category, DEFAULT_CATEGORY);
        assert_eq!(doc.impact, DEFAULT_IMPACT);
        assert_eq!(doc.size_bytes, 2500);

        let chunks = store.list_chunks().await.unwrap();
        assert_eq!(chunks[0].metadata["char_offset"], 0);
        assert_eq!(chunks[3].metadata["char_offset"], 2400);
    }

    #[tokio::test]
    async fn test_ingest_without_provider_stores_plain_chunks() {
        let store = Arc::new(InMemoryStore::new());
        let embedder = Arc::new(CountingDisabled::default());
        let report = pipeline(store.clone(), embedder.clone())
            .ingest(
                IngestRequest::new("notes.md", "text/markdown", text_of(2500))
                    .with_category("KYC")
                    .with_impact("High"),
            )
            .await
            .unwrap();

        assert_eq!(report.chunks, 4);
        assert_eq!(report.embedded, 0);
        // Only the first chunk reaches the provider.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert!(store.list_chunks_with_vectors().await.unwrap().is_empty());

        let doc = store.get_document(report.document_id).await.unwrap().unwrap();
        assert_eq!(doc.category, "KYC");
        assert_eq!(doc.impact, "High");
    }

    #[tokio::test]
    async fn test_single_chunk_failure_keeps_others() {
        let store = Arc::new(InMemoryStore::new());
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            fail_on: Some(1),
        });
        let report = pipeline(store.clone(), embedder.clone())
            .ingest(IngestRequest::new("a.txt", "text/plain", text_of(2500)))
            .await
            .unwrap();

        assert_eq!(report.chunks, 4);
        assert_eq!(report.embedded, 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
        let chunks = store.list_chunks().await.unwrap();
        assert!(chunks[1].embedding.is_none());
    }

    #[tokio::test]
    async fn test_extraction_failure_marks_error() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = IngestionPipeline::new(
            store.clone(),
            Arc::new(DisabledEmbedder::new()),
            Arc::new(RejectingExtractor),
            Chunker::default(),
        );

        let err = pipeline
            .ingest(IngestRequest::new("scan.pdf", "application/pdf", vec![0, 1, 2]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));

        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].status, DocumentStatus::Error);
        assert_eq!(store.count_chunks(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_whitespace_only_document_is_ready_with_no_chunks() {
        let store = Arc::new(InMemoryStore::new());
        let report = pipeline(store.clone(), Arc::new(DisabledEmbedder::new()))
            .ingest(IngestRequest::new("blank.txt", "text/plain", b"   \n\t ".to_vec()))
            .await
            .unwrap();
        assert_eq!(report.chunks, 0);
        let doc = store.get_document(report.document_id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Ready);
    }

    #[tokio::test]
    async fn test_blank_category_uses_default() {
        let store = Arc::new(InMemoryStore::new());
        let report = pipeline(store.clone(), Arc::new(DisabledEmbedder::new()))
            .ingest(IngestRequest::new("x.txt", "text/plain", b"some useful content".to_vec()).with_category("  "))
            .await
            .unwrap();
        let doc = store.get_document(report.document_id).await.unwrap().unwrap();
        assert_eq!(doc.category, DEFAULT_CATEGORY);
    }

    /// Delegates to an in-memory store but refuses chunk writes.
    struct ChunkWriteFails(InMemoryStore);

    #[async_trait]
    impl Store for ChunkWriteFails {
        async fn insert_document(&self, doc: &NewDocument) -> anyhow::Result<i64> {
            self.0.insert_document(doc).await
        }
        async fn set_document_status(&self, id: i64, status: DocumentStatus) -> anyhow::Result<()> {
            self.0.set_document_status(id, status).await
        }
        async fn get_document(&self, id: i64) -> anyhow::Result<Option<Document>> {
            self.0.get_document(id).await
        }
        async fn list_documents(&self) -> anyhow::Result<Vec<Document>> {
            self.0.list_documents().await
        }
        async fn delete_document(&self, id: i64) -> anyhow::Result<bool> {
            self.0.delete_document(id).await
        }
        async fn insert_chunk(&self, _document_id: i64, _chunk: &NewChunk) -> anyhow::Result<i64> {
            anyhow::bail!("disk full")
        }
        async fn insert_chunks(&self, _document_id: i64, _chunks: &[NewChunk]) -> anyhow::Result<Vec<i64>> {
            anyhow::bail!("disk full")
        }
        async fn list_chunks(&self) -> anyhow::Result<Vec<StoredChunk>> {
            self.0.list_chunks().await
        }
        async fn list_chunks_with_vectors(&self) -> anyhow::Result<Vec<StoredChunk>> {
            self.0.list_chunks_with_vectors().await
        }
        async fn count_chunks(&self, document_id: Option<i64>) -> anyhow::Result<i64> {
            self.0.count_chunks(document_id).await
        }
        async fn append_query_log(&self, q: &str, a: &str, ms: i64) -> anyhow::Result<i64> {
            self.0.append_query_log(q, a, ms).await
        }
        async fn list_query_log(&self, limit: i64) -> anyhow::Result<Vec<QueryLogEntry>> {
            self.0.list_query_log(limit).await
        }
        async fn stats(&self) -> anyhow::Result<StoreStats> {
            self.0.stats().await
        }
    }

    #[tokio::test]
    async fn test_storage_failure_marks_error() {
        let store = Arc::new(ChunkWriteFails(InMemoryStore::new()));
        let err = pipeline(store.clone(), Arc::new(DisabledEmbedder::new()))
            .ingest(IngestRequest::new("x.txt", "text/plain", text_of(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        let docs = store.list_documents().await.unwrap();
        assert_eq!(docs[0].status, DocumentStatus::Error);
    }
}
