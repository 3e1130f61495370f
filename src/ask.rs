//! `ragdesk ask`: answer a question from the command line.

use anyhow::Result;

use ragdesk_core::answer::AnswerOutcome;

use crate::app::App;
use crate::config::Config;

pub async fn run_ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let app = App::open(config).await?;
    let result = app.assistant.ask(question).await;
    app.close().await;
    let response = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("{}", response.answer);
    if !response.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, source) in response.sources.iter().enumerate() {
            println!("  {}. {}", i + 1, source.document_name);
            println!("     {}", source.excerpt.replace('\n', " "));
        }
    }
    println!();

    let mode = match response.outcome {
        AnswerOutcome::Generated => "generated",
        AnswerOutcome::Templated => "templated (generation failed)",
        AnswerOutcome::Demo => "demo",
    };
    match response.fallback_reason {
        Some(reason) => println!(
            "retrieval: {} ({:?}) | answer: {} | {} ms",
            response.strategy, reason, mode, response.latency_ms
        ),
        None => println!(
            "retrieval: {} | answer: {} | {} ms",
            response.strategy, mode, response.latency_ms
        ),
    }
    Ok(())
}
