//! # ragdesk core
//!
//! The retrieval pipeline behind ragdesk: chunking, the embedding trait and
//! vector codec, cosine top-K search, keyword fallback, retrieval, answer
//! assembly, document ingestion, and the store abstraction.
//!
//! This crate performs no network or database I/O. Providers and the
//! SQLite store are supplied by the `ragdesk` application through the
//! [`embedding::Embedder`], [`answer::Generator`], [`ingest::TextExtractor`]
//! and [`store::Store`] traits.

pub mod answer;
pub mod assistant;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod keyword;
pub mod models;
pub mod retrieve;
pub mod store;

pub use error::{Error, Result};
