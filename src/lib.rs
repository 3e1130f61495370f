//! # ragdesk
//!
//! Retrieval-augmented question answering over uploaded documents.
//!
//! The retrieval core (chunking, vectors, keyword fallback, answering and
//! the ingestion pipeline) lives in `ragdesk-core`. This crate supplies the
//! concrete pieces around it: SQLite storage, HTTP embedding and generation
//! providers, PDF/DOCX extraction, the CLI commands and the HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────┐   ┌──────────┐
//! │  Upload /   │──▶│ Extract → Chunk  │──▶│  SQLite  │
//! │  ingest     │   │ → Embed          │   │ chunks + │
//! └─────────────┘   └──────────────────┘   │ vectors  │
//!                                          └────┬─────┘
//!                   ┌──────────────────┐        │
//!   question ──────▶│ Retrieve → Answer│◀───────┘
//!                   └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] / [`migrate`] | Connection pool and schema |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` |
//! | [`embedding`] | OpenAI / Ollama / Gemini embedders |
//! | [`generation`] | OpenAI / Ollama / Gemini generators |
//! | [`extract`] | PDF, DOCX and text extraction |
//! | [`app`] | Builds the pipeline and assistant from config |
//! | [`server`] | HTTP API |

pub mod app;
pub mod ask;
pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod extract;
pub mod generation;
pub mod history;
pub mod ingest;
pub mod migrate;
pub mod seed;
pub mod server;
pub mod sqlite_store;
pub mod stats;
