//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the `documents`, `chunks` and
//! `queries` tables created by [`crate::migrate`]. Timestamps are stored as
//! Unix seconds; vectors as codec-v1 BLOBs (see
//! [`ragdesk_core::embedding::vec_to_blob`]).

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use ragdesk_core::embedding::{blob_to_vec, vec_to_blob, EmbeddingVector};
use ragdesk_core::models::{
    Document, DocumentStatus, NewChunk, NewDocument, QueryLogEntry, StoreStats, StoredChunk,
};
use ragdesk_core::store::Store;

const CHUNK_SELECT: &str = r#"
    SELECT c.id, c.document_id, d.name AS document_name, c.content, c.embedding, c.metadata_json
    FROM chunks c
    JOIN documents d ON d.id = c.document_id
"#;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn from_ts(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow!("invalid timestamp: {}", ts))
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    let status: String = row.get("status");
    Ok(Document {
        id: row.get("id"),
        name: row.get("name"),
        media_type: row.get("media_type"),
        size_bytes: row.get("size_bytes"),
        status: status.parse()?,
        category: row.get("category"),
        impact: row.get("impact"),
        created_at: from_ts(row.get("created_at"))?,
    })
}

fn row_to_chunk(row: &SqliteRow) -> StoredChunk {
    let id: i64 = row.get("id");
    let blob: Option<Vec<u8>> = row.get("embedding");
    let embedding = blob.and_then(|b| match blob_to_vec(&b) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(chunk_id = id, error = %e, "ignoring undecodable chunk vector");
            None
        }
    });
    let metadata_json: String = row.get("metadata_json");

    StoredChunk {
        id,
        document_id: row.get("document_id"),
        document_name: row.get("document_name"),
        content: row.get("content"),
        embedding,
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({})),
    }
}

fn embedding_blob(embedding: &Option<EmbeddingVector>) -> Option<Vec<u8>> {
    embedding.as_ref().map(vec_to_blob)
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, doc: &NewDocument) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (name, media_type, size_bytes, status, category, impact, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.name)
        .bind(&doc.media_type)
        .bind(doc.size_bytes)
        .bind(DocumentStatus::Processing.as_str())
        .bind(&doc.category)
        .bind(&doc.impact)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn set_document_status(&self, id: i64, status: DocumentStatus) -> Result<()> {
        let result = sqlx::query("UPDATE documents SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            bail!("document {} not found", id);
        }
        Ok(())
    }

    async fn get_document(&self, id: i64) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, name, media_type, size_bytes, status, category, impact, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, media_type, size_bytes, status, category, impact, created_at
            FROM documents
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_document).collect()
    }

    async fn delete_document(&self, id: i64) -> Result<bool> {
        // chunks go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_chunk(&self, document_id: i64, chunk: &NewChunk) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO chunks (document_id, content, embedding, metadata_json) VALUES (?, ?, ?, ?)",
        )
        .bind(document_id)
        .bind(&chunk.content)
        .bind(embedding_blob(&chunk.embedding))
        .bind(chunk.metadata.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_chunks(&self, document_id: i64, chunks: &[NewChunk]) -> Result<Vec<i64>> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let result = sqlx::query(
                "INSERT INTO chunks (document_id, content, embedding, metadata_json) VALUES (?, ?, ?, ?)",
            )
            .bind(document_id)
            .bind(&chunk.content)
            .bind(embedding_blob(&chunk.embedding))
            .bind(chunk.metadata.to_string())
            .execute(&mut *tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn list_chunks(&self) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(&format!("{} ORDER BY c.id ASC", CHUNK_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_chunk).collect())
    }

    async fn list_chunks_with_vectors(&self) -> Result<Vec<StoredChunk>> {
        let rows = sqlx::query(&format!(
            "{} WHERE c.embedding IS NOT NULL ORDER BY c.id ASC",
            CHUNK_SELECT
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(row_to_chunk)
            .filter(|c| c.embedding.is_some())
            .collect())
    }

    async fn count_chunks(&self, document_id: Option<i64>) -> Result<i64> {
        let count: i64 = match document_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE document_id = ?")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    async fn append_query_log(
        &self,
        question: &str,
        answer: &str,
        response_time_ms: i64,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO queries (question, answer, response_time_ms, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(question)
        .bind(answer)
        .bind(response_time_ms)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_query_log(&self, limit: i64) -> Result<Vec<QueryLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, question, answer, response_time_ms, created_at
            FROM queries
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(QueryLogEntry {
                    id: row.get("id"),
                    question: row.get("question"),
                    answer: row.get("answer"),
                    response_time_ms: row.get("response_time_ms"),
                    created_at: from_ts(row.get("created_at"))?,
                })
            })
            .collect()
    }

    async fn stats(&self) -> Result<StoreStats> {
        let total_documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let embedded_chunks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        let total_queries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queries")
            .fetch_one(&self.pool)
            .await?;
        let last: Option<i64> = sqlx::query_scalar("SELECT MAX(created_at) FROM documents")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            total_documents,
            total_chunks,
            embedded_chunks,
            total_queries,
            last_ingested_at: last.map(from_ts).transpose()?,
        })
    }
}
