//! Sample content for `ragdesk init --seed`.
//!
//! Inserts one regulatory circular, one chunk and one logged question so a
//! fresh dashboard has something to show. Does nothing when the store
//! already holds documents.

use anyhow::Result;

use ragdesk_core::chunk::Chunker;
use ragdesk_core::models::{DocumentStatus, NewChunk, NewDocument};
use ragdesk_core::store::Store;

const SAMPLE_NAME: &str = "RBI_Master_Circular_2024.pdf";
const SAMPLE_SIZE_BYTES: i64 = 1_024_567;
const SAMPLE_CHUNK: &str = "The Reserve Bank of India (RBI) has updated the Master Circular on KYC \
norms for 2024. Key changes include mandatory periodic updation of KYC for high-risk customers \
every 2 years.";
const SAMPLE_QUESTION: &str = "What are the new KYC norms for 2024?";
const SAMPLE_ANSWER: &str = "According to the RBI Master Circular 2024, high-risk customers must \
update their KYC every 2 years. Low-risk customers can update every 10 years.";

/// Returns `true` when sample rows were written.
pub async fn seed_sample(store: &dyn Store) -> Result<bool> {
    if !store.list_documents().await?.is_empty() {
        return Ok(false);
    }

    let id = store
        .insert_document(&NewDocument {
            name: SAMPLE_NAME.to_string(),
            media_type: "application/pdf".to_string(),
            size_bytes: SAMPLE_SIZE_BYTES,
            category: "Regulatory".to_string(),
            impact: "High".to_string(),
        })
        .await?;
    store
        .insert_chunk(
            id,
            &NewChunk {
                content: SAMPLE_CHUNK.to_string(),
                embedding: None,
                metadata: Chunker::default()
                    .windows(SAMPLE_CHUNK)
                    .next()
                    .map(|w| w.metadata())
                    .unwrap_or_default(),
            },
        )
        .await?;
    store.set_document_status(id, DocumentStatus::Ready).await?;
    store
        .append_query_log(SAMPLE_QUESTION, SAMPLE_ANSWER, 450)
        .await?;

    tracing::info!(document_id = id, "seeded sample document");
    Ok(true)
}
