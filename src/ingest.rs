//! `ragdesk ingest`: load files from disk into the knowledge base.
//!
//! Each path may be a file or a directory; directories are walked
//! recursively and hidden entries are skipped. A file that fails extraction
//! is reported and the run continues; the command fails at the end if any
//! file failed.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use ragdesk_core::error::Error;
use ragdesk_core::ingest::IngestRequest;

use crate::app::App;
use crate::config::Config;
use crate::extract::media_type_for_path;

pub struct IngestOptions {
    pub category: Option<String>,
    pub impact: Option<String>,
    /// Overrides the extension-based media type for every file.
    pub media_type: Option<String>,
}

pub async fn run_ingest(config: &Config, paths: &[PathBuf], options: &IngestOptions) -> Result<()> {
    let files = collect_files(paths)?;
    if files.is_empty() {
        bail!("No files found under the given paths");
    }

    let app = App::open(config).await?;

    let mut ingested = 0usize;
    let mut failed = 0usize;
    let mut total_chunks = 0usize;
    let mut total_embedded = 0usize;

    for path in &files {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let media_type = options
            .media_type
            .clone()
            .unwrap_or_else(|| media_type_for_path(path).to_string());

        let mut request = IngestRequest::new(name.clone(), media_type, bytes);
        if let Some(category) = &options.category {
            request = request.with_category(category.clone());
        }
        if let Some(impact) = &options.impact {
            request = request.with_impact(impact.clone());
        }

        match app.pipeline.ingest(request).await {
            Ok(report) => {
                println!(
                    "ingested {}: document {}, {} chunks, {} embedded",
                    name, report.document_id, report.chunks, report.embedded
                );
                ingested += 1;
                total_chunks += report.chunks;
                total_embedded += report.embedded;
            }
            Err(Error::Extraction(message)) => {
                eprintln!("failed {}: {}", name, message);
                failed += 1;
            }
            Err(e) => {
                app.close().await;
                return Err(e).with_context(|| format!("Failed to ingest {}", path.display()));
            }
        }
    }

    println!(
        "ingest complete: {} documents, {} chunks, {} embedded",
        ingested, total_chunks, total_embedded
    );
    app.close().await;

    if failed > 0 {
        bail!("{} file(s) could not be extracted", failed);
    }
    Ok(())
}

fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in paths {
        if !root.exists() {
            bail!("Path does not exist: {}", root.display());
        }
        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        {
            let entry = entry?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
