//! Storage abstraction for ragdesk.
//!
//! The [`Store`] trait defines every storage operation the ingestion and
//! retrieval pipeline needs, so the pipeline can run against SQLite in the
//! application and against [`memory::InMemoryStore`] in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Methods return `anyhow::Result`; the pipeline wraps failures into
//! [`Error::Storage`](crate::Error::Storage).

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Document, DocumentStatus, NewChunk, NewDocument, QueryLogEntry, StoreStats, StoredChunk,
};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_document`](Store::insert_document) | Create a document row in `Processing` |
/// | [`set_document_status`](Store::set_document_status) | Move a document to `Ready` / `Error` |
/// | [`insert_chunks`](Store::insert_chunks) | Persist all chunks of a document atomically |
/// | [`list_chunks`](Store::list_chunks) | Every chunk, in storage order |
/// | [`list_chunks_with_vectors`](Store::list_chunks_with_vectors) | Chunks that carry an embedding |
/// | [`delete_document`](Store::delete_document) | Remove a document and its chunks |
/// | [`append_query_log`](Store::append_query_log) | Record an answered question |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a document with status `Processing` and return its id.
    async fn insert_document(&self, doc: &NewDocument) -> Result<i64>;

    async fn set_document_status(&self, id: i64, status: DocumentStatus) -> Result<()>;

    async fn get_document(&self, id: i64) -> Result<Option<Document>>;

    /// All documents, newest first.
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Delete a document and every chunk that belongs to it.
    ///
    /// Returns `false` if no such document existed.
    async fn delete_document(&self, id: i64) -> Result<bool>;

    /// Insert one chunk and return its id.
    async fn insert_chunk(&self, document_id: i64, chunk: &NewChunk) -> Result<i64>;

    /// Insert every chunk of a document so that either all or none become
    /// visible. Returns the ids in input order.
    async fn insert_chunks(&self, document_id: i64, chunks: &[NewChunk]) -> Result<Vec<i64>>;

    /// Every chunk in storage (insertion) order.
    async fn list_chunks(&self) -> Result<Vec<StoredChunk>>;

    /// Chunks whose embedding is present, in storage order.
    async fn list_chunks_with_vectors(&self) -> Result<Vec<StoredChunk>>;

    /// Chunk count, either overall or for one document.
    async fn count_chunks(&self, document_id: Option<i64>) -> Result<i64>;

    /// Append to the query log and return the entry id.
    async fn append_query_log(
        &self,
        question: &str,
        answer: &str,
        response_time_ms: i64,
    ) -> Result<i64>;

    /// Most recent query log entries, newest first.
    async fn list_query_log(&self, limit: i64) -> Result<Vec<QueryLogEntry>>;

    async fn stats(&self) -> Result<StoreStats>;
}
