//! Knowledge-base statistics.
//!
//! Provides a quick summary of what's indexed: document and chunk counts,
//! embedding coverage, how many questions were answered and when the last
//! document arrived. Used by `ragdesk stats`.

use anyhow::Result;

use crate::app::App;
use crate::config::Config;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let app = App::open(config).await?;
    let stats = app.store.stats().await?;
    let documents = app.store.list_documents().await?;
    app.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("ragdesk: Knowledge Base Stats");
    println!("=============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", stats.total_documents);
    println!("  Chunks:      {}", stats.total_chunks);
    println!(
        "  Embedded:    {} / {} ({}%)",
        stats.embedded_chunks,
        stats.total_chunks,
        percent(stats.embedded_chunks, stats.total_chunks)
    );
    println!("  Queries:     {}", stats.total_queries);
    println!(
        "  Last ingest: {}",
        stats
            .last_ingested_at
            .map(|ts| format_ts_relative(ts.timestamp()))
            .unwrap_or_else(|| "never".to_string())
    );

    let failed = documents
        .iter()
        .filter(|d| d.status == ragdesk_core::models::DocumentStatus::Error)
        .count();
    if failed > 0 {
        println!();
        println!("  {} document(s) failed to process", failed);
    }

    println!();
    Ok(())
}

fn percent(part: i64, total: i64) -> i64 {
    if total > 0 {
        (part * 100) / total
    } else {
        0
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        plural(delta / 60, "min")
    } else if delta < 86400 {
        plural(delta / 3600, "hour")
    } else if delta < 86400 * 30 {
        plural(delta / 86400, "day")
    } else {
        format_ts_iso(ts)
    }
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_are_human_readable() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn relative_timestamps() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 3600), "1 hour ago");
        assert_eq!(format_ts_relative(now - 3 * 86400), "3 days ago");
    }

    #[test]
    fn coverage_percent_handles_empty_store() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 4), 25);
    }
}
