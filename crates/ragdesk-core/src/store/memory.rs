//! In-memory [`Store`] implementation for testing.
//!
//! All tables live behind a single `std::sync::RwLock`, so a multi-chunk
//! insert or a cascading delete is observed atomically by readers. Ids are
//! assigned from monotonically increasing counters, like SQLite rowids.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{
    Document, DocumentStatus, NewChunk, NewDocument, QueryLogEntry, StoreStats, StoredChunk,
};

use super::Store;

struct ChunkRow {
    id: i64,
    document_id: i64,
    chunk: NewChunk,
}

#[derive(Default)]
struct Tables {
    next_document_id: i64,
    next_chunk_id: i64,
    next_query_id: i64,
    documents: Vec<Document>,
    chunks: Vec<ChunkRow>,
    queries: Vec<QueryLogEntry>,
}

impl Tables {
    fn document_name(&self, id: i64) -> String {
        self.documents
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.clone())
            .unwrap_or_default()
    }

    fn joined(&self, row: &ChunkRow) -> StoredChunk {
        StoredChunk {
            id: row.id,
            document_id: row.document_id,
            document_name: self.document_name(row.document_id),
            content: row.chunk.content.clone(),
            embedding: row.chunk.embedding.clone(),
            metadata: row.chunk.metadata.clone(),
        }
    }

    fn push_chunk(&mut self, document_id: i64, chunk: &NewChunk) -> i64 {
        self.next_chunk_id += 1;
        let id = self.next_chunk_id;
        self.chunks.push(ChunkRow {
            id,
            document_id,
            chunk: chunk.clone(),
        });
        id
    }
}

/// In-memory store for tests and embedding the pipeline without a database.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_document(&self, doc: &NewDocument) -> Result<i64> {
        let mut tables = self.write()?;
        tables.next_document_id += 1;
        let id = tables.next_document_id;
        tables.documents.push(Document {
            id,
            name: doc.name.clone(),
            media_type: doc.media_type.clone(),
            size_bytes: doc.size_bytes,
            status: DocumentStatus::Processing,
            category: doc.category.clone(),
            impact: doc.impact.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn set_document_status(&self, id: i64, status: DocumentStatus) -> Result<()> {
        let mut tables = self.write()?;
        match tables.documents.iter_mut().find(|d| d.id == id) {
            Some(doc) => {
                doc.status = status;
                Ok(())
            }
            None => bail!("document {} not found", id),
        }
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let tables = self.read()?;
        Ok(tables.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let tables = self.read()?;
        let mut docs = tables.documents.clone();
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(docs)
    }

    async fn delete_document(&self, id: i64) -> Result<bool> {
        let mut tables = self.write()?;
        let before = tables.documents.len();
        tables.documents.retain(|d| d.id != id);
        if tables.documents.len() == before {
            return Ok(false);
        }
        tables.chunks.retain(|c| c.document_id != id);
        Ok(true)
    }

    async fn insert_chunk(&self, document_id: i64, chunk: &NewChunk) -> Result<i64> {
        let mut tables = self.write()?;
        if !tables.documents.iter().any(|d| d.id == document_id) {
            bail!("document {} not found", document_id);
        }
        Ok(tables.push_chunk(document_id, chunk))
    }

    async fn insert_chunks(&self, document_id: i64, chunks: &[NewChunk]) -> Result<Vec<i64>> {
        let mut tables = self.write()?;
        if !tables.documents.iter().any(|d| d.id == document_id) {
            bail!("document {} not found", document_id);
        }
        Ok(chunks
            .iter()
            .map(|c| tables.push_chunk(document_id, c))
            .collect())
    }

    async fn list_chunks(&self) -> Result<Vec<StoredChunk>> {
        let tables = self.read()?;
        Ok(tables.chunks.iter().map(|row| tables.joined(row)).collect())
    }

    async fn list_chunks_with_vectors(&self) -> Result<Vec<StoredChunk>> {
        let tables = self.read()?;
        Ok(tables
            .chunks
            .iter()
            .filter(|row| row.chunk.embedding.is_some())
            .map(|row| tables.joined(row))
            .collect())
    }

    async fn count_chunks(&self, document_id: Option<i64>) -> Result<i64> {
        let tables = self.read()?;
        let count = tables
            .chunks
            .iter()
            .filter(|row| document_id.map_or(true, |id| row.document_id == id))
            .count();
        Ok(count as i64)
    }

    async fn append_query_log(
        &self,
        question: &str,
        answer: &str,
        response_time_ms: i64,
    ) -> Result<i64> {
        let mut tables = self.write()?;
        tables.next_query_id += 1;
        let id = tables.next_query_id;
        tables.queries.push(QueryLogEntry {
            id,
            question: question.to_string(),
            answer: answer.to_string(),
            response_time_ms,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_query_log(&self, limit: i64) -> Result<Vec<QueryLogEntry>> {
        let tables = self.read()?;
        Ok(tables
            .queries
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let tables = self.read()?;
        Ok(StoreStats {
            total_documents: tables.documents.len() as i64,
            total_chunks: tables.chunks.len() as i64,
            embedded_chunks: tables
                .chunks
                .iter()
                .filter(|row| row.chunk.embedding.is_some())
                .count() as i64,
            total_queries: tables.queries.len() as i64,
            last_ingested_at: tables.documents.iter().map(|d| d.created_at).max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingVector;
    use crate::models::{DEFAULT_CATEGORY, DEFAULT_IMPACT};

    fn new_doc(name: &str) -> NewDocument {
        NewDocument {
            name: name.to_string(),
            media_type: "text/plain".to_string(),
            size_bytes: 42,
            category: DEFAULT_CATEGORY.to_string(),
            impact: DEFAULT_IMPACT.to_string(),
        }
    }

    fn chunk(content: &str, embedding: Option<Vec<f32>>) -> NewChunk {
        NewChunk {
            content: content.to_string(),
            embedding: embedding.map(EmbeddingVector::new),
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn test_document_lifecycle() {
        let store = InMemoryStore::new();
        let id = store.insert_document(&new_doc("circular.txt")).await.unwrap();

        let doc = store.get_document(id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Processing);
        assert_eq!(doc.category, "Uncategorized");

        store
            .set_document_status(id, DocumentStatus::Ready)
            .await
            .unwrap();
        let doc = store.get_document(id).await.unwrap().unwrap();
        assert_eq!(doc.status, DocumentStatus::Ready);

        assert!(store.get_document(id + 100).await.unwrap().is_none());
        assert!(store
            .set_document_status(id + 100, DocumentStatus::Ready)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_chunks_keep_storage_order_and_join_name() {
        let store = InMemoryStore::new();
        let a = store.insert_document(&new_doc("a.txt")).await.unwrap();
        let b = store.insert_document(&new_doc("b.txt")).await.unwrap();

        store
            .insert_chunks(a, &[chunk("a0", Some(vec![1.0])), chunk("a1", None)])
            .await
            .unwrap();
        store.insert_chunk(b, &chunk("b0", Some(vec![0.5]))).await.unwrap();

        let all = store.list_chunks().await.unwrap();
        let contents: Vec<&str> = all.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["a0", "a1", "b0"]);
        assert_eq!(all[2].document_name, "b.txt");

        let with_vectors = store.list_chunks_with_vectors().await.unwrap();
        let contents: Vec<&str> = with_vectors.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["a0", "b0"]);
    }

    #[tokio::test]
    async fn test_insert_chunks_for_missing_document_inserts_nothing() {
        let store = InMemoryStore::new();
        let result = store
            .insert_chunks(7, &[chunk("orphan", None), chunk("orphan2", None)])
            .await;
        assert!(result.is_err());
        assert_eq!(store.count_chunks(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_cascades_only_to_own_chunks() {
        let store = InMemoryStore::new();
        let doomed = store.insert_document(&new_doc("doomed.txt")).await.unwrap();
        let kept = store.insert_document(&new_doc("kept.txt")).await.unwrap();
        store
            .insert_chunks(doomed, &[chunk("d0", None), chunk("d1", None), chunk("d2", None)])
            .await
            .unwrap();
        store
            .insert_chunks(kept, &[chunk("k0", None), chunk("k1", None)])
            .await
            .unwrap();

        assert!(store.delete_document(doomed).await.unwrap());

        assert_eq!(store.count_chunks(Some(doomed)).await.unwrap(), 0);
        assert_eq!(store.count_chunks(Some(kept)).await.unwrap(), 2);
        assert_eq!(store.count_chunks(None).await.unwrap(), 2);
        assert!(!store.delete_document(doomed).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_log_newest_first() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .append_query_log(&format!("q{}", i), "a", i)
                .await
                .unwrap();
        }
        let recent = store.list_query_log(3).await.unwrap();
        let questions: Vec<&str> = recent.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(questions, vec!["q4", "q3", "q2"]);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = InMemoryStore::new();
        assert_eq!(store.stats().await.unwrap().total_documents, 0);
        assert!(store.stats().await.unwrap().last_ingested_at.is_none());

        let id = store.insert_document(&new_doc("x.txt")).await.unwrap();
        store
            .insert_chunks(id, &[chunk("x0", Some(vec![1.0, 0.0])), chunk("x1", None)])
            .await
            .unwrap();
        store.append_query_log("q", "a", 10).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_documents, 1);
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.embedded_chunks, 1);
        assert_eq!(stats.total_queries, 1);
        assert!(stats.last_ingested_at.is_some());
    }
}
