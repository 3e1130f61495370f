//! `ragdesk documents`: list and delete ingested documents.

use anyhow::{bail, Result};

use crate::app::App;
use crate::config::Config;

pub async fn run_list(config: &Config) -> Result<()> {
    let app = App::open(config).await?;
    let documents = app.store.list_documents().await?;

    if documents.is_empty() {
        println!("No documents.");
        app.close().await;
        return Ok(());
    }

    println!(
        "{:>5}  {:<32} {:<11} {:<16} {:<8} {:>7}  {}",
        "ID", "NAME", "STATUS", "CATEGORY", "IMPACT", "CHUNKS", "CREATED"
    );
    for doc in &documents {
        let chunks = app.store.count_chunks(Some(doc.id)).await?;
        println!(
            "{:>5}  {:<32} {:<11} {:<16} {:<8} {:>7}  {}",
            doc.id,
            doc.name,
            doc.status.as_str(),
            doc.category,
            doc.impact,
            chunks,
            doc.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    app.close().await;
    Ok(())
}

pub async fn run_delete(config: &Config, id: i64) -> Result<()> {
    let app = App::open(config).await?;
    let chunks = app.store.count_chunks(Some(id)).await?;
    let deleted = app.store.delete_document(id).await?;
    app.close().await;

    if !deleted {
        bail!("No document with id {}", id);
    }
    tracing::info!(document_id = id, chunks, "document deleted");
    println!("deleted document {} ({} chunks)", id, chunks);
    Ok(())
}
