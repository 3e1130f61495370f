//! Wiring: configuration in, ready-to-use pipeline and assistant out.
//!
//! Every command that touches the database goes through [`App::open`], so
//! the CLI and the HTTP server share one construction path.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use ragdesk_core::answer::{AnswerParams, Answerer};
use ragdesk_core::assistant::Assistant;
use ragdesk_core::chunk::Chunker;
use ragdesk_core::ingest::IngestionPipeline;
use ragdesk_core::retrieve::{RetrievalParams, Retriever};
use ragdesk_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::extract::DocumentExtractor;
use crate::generation::create_generator;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

pub struct App {
    pool: SqlitePool,
    pub store: Arc<dyn Store>,
    pub pipeline: IngestionPipeline,
    pub assistant: Assistant,
}

impl App {
    /// Connect, apply migrations and build the providers named in `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply(&pool).await?;

        let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool.clone()));
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;

        let chunker = Chunker::new(config.chunking.chunk_chars, config.chunking.overlap_chars)
            .context("Invalid [chunking] settings")?
            .with_min_chars(config.chunking.min_chars);

        tracing::debug!(
            embedder = embedder.model_name(),
            chunk_chars = chunker.chunk_chars(),
            overlap_chars = chunker.overlap_chars(),
            min_chars = chunker.min_chars(),
            db = %config.db.path.display(),
            "application ready"
        );

        let pipeline = IngestionPipeline::new(
            store.clone(),
            embedder.clone(),
            Arc::new(DocumentExtractor),
            chunker,
        );

        let retriever = Retriever::new(
            store.clone(),
            embedder.clone(),
            RetrievalParams {
                top_k: config.retrieval.top_k,
                keyword_limit: config.retrieval.keyword_limit,
            },
        );
        let answerer = Answerer::new(
            generator,
            AnswerParams {
                preamble: config.generation.preamble.clone(),
                max_context_chars: config.generation.max_context_chars,
            },
        );
        if answerer.is_demo() {
            tracing::info!("no generation provider configured, running in demo mode");
        }

        Ok(Self {
            pool,
            store: store.clone(),
            pipeline,
            assistant: Assistant::new(store, retriever, answerer),
        })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
