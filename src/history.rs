//! `ragdesk history`: recent questions and answers.

use anyhow::Result;

use ragdesk_core::answer::truncate_chars;

use crate::app::App;
use crate::config::Config;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

const ANSWER_PREVIEW_CHARS: usize = 120;

pub async fn run_history(config: &Config, limit: i64) -> Result<()> {
    let app = App::open(config).await?;
    let entries = app.store.list_query_log(limit).await?;
    app.close().await;

    if entries.is_empty() {
        println!("No queries yet.");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "[{}] {} ({} ms)",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.question,
            entry.response_time_ms
        );
        let preview = entry.answer.replace('\n', " ");
        let short = truncate_chars(&preview, ANSWER_PREVIEW_CHARS);
        if short.len() < preview.len() {
            println!("    {}…", short);
        } else {
            println!("    {}", short);
        }
    }
    Ok(())
}
