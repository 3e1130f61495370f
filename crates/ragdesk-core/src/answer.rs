//! Context assembly and answer generation.
//!
//! The [`Answerer`] joins the retrieved chunks into a context block, asks
//! the configured [`Generator`] for an answer, and falls back to a
//! deterministic template when generation is impossible:
//!
//! - generator configured and successful → [`AnswerOutcome::Generated`]
//! - generator configured but failing → [`AnswerOutcome::Templated`]
//! - no generator → [`AnswerOutcome::Demo`]
//!
//! Answering never fails; every path yields an [`Answer`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::retrieve::Retrieval;

/// Default cap on the context block sent to the generator, in chars.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 12_000;

/// Default system preamble placed at the top of every prompt.
pub const DEFAULT_PREAMBLE: &str = "You are the RBI Regulatory Assistant, a specialized AI for Reserve \
Bank of India guidelines and banking regulations.\nYour goal is to provide accurate, professional, and \
scannable information based on the provided context.";

const NO_CONTEXT: &str = "No specific context found.";
const TEMPLATED_LEAD: &str =
    "Based on the documents in our repository, I found information related to your query.";
const TEMPLATED_EMPTY: &str = "However, I couldn't generate a detailed response at this moment.";
const DEMO_LEAD: &str = "[DEMO MODE] Based on the documents in our repository:";
const DEMO_EMPTY: &str =
    "I found no specific information regarding your query. Please try uploading more documents.";

const TEMPLATED_EXCERPT_CHARS: usize = 200;
const DEMO_EXCERPT_CHARS: usize = 300;

/// Trait for text generation providers.
///
/// Like [`Embedder`](crate::embedding::Embedder), implementations perform
/// no retries. The answerer treats every error the same way.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct AnswerParams {
    pub preamble: String,
    pub max_context_chars: usize,
}

impl Default for AnswerParams {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerOutcome {
    Generated,
    Templated,
    Demo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    pub outcome: AnswerOutcome,
    pub latency_ms: u64,
}

pub struct Answerer {
    generator: Option<Arc<dyn Generator>>,
    params: AnswerParams,
}

impl Answerer {
    /// `generator = None` runs in demo mode.
    pub fn new(generator: Option<Arc<dyn Generator>>, params: AnswerParams) -> Self {
        Self { generator, params }
    }

    pub fn is_demo(&self) -> bool {
        self.generator.is_none()
    }

    pub async fn answer(&self, question: &str, retrieval: &Retrieval) -> Answer {
        let started = Instant::now();
        let context = build_context(retrieval);

        let (text, outcome) = match &self.generator {
            None => (demo_answer(&context), AnswerOutcome::Demo),
            Some(generator) => {
                let prompt = build_prompt(
                    &self.params.preamble,
                    &context,
                    question,
                    self.params.max_context_chars,
                );
                match generator.generate(&prompt).await {
                    Ok(text) => (text, AnswerOutcome::Generated),
                    Err(e) => {
                        tracing::warn!(
                            model = generator.model_name(),
                            error = %e,
                            "generation failed, returning templated answer"
                        );
                        (templated_answer(&context), AnswerOutcome::Templated)
                    }
                }
            }
        };

        Answer {
            text,
            outcome,
            latency_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Retrieved contents in ranked order, separated by a blank line.
pub fn build_context(retrieval: &Retrieval) -> String {
    retrieval
        .chunks()
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the generator prompt. The context block is cut to
/// `max_context_chars`.
pub fn build_prompt(preamble: &str, context: &str, question: &str, max_context_chars: usize) -> String {
    let context = if context.is_empty() {
        NO_CONTEXT
    } else {
        truncate_chars(context, max_context_chars)
    };
    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
        preamble, context, question
    )
}

pub fn templated_answer(context: &str) -> String {
    if context.is_empty() {
        format!("{} {}", TEMPLATED_LEAD, TEMPLATED_EMPTY)
    } else {
        format!(
            "{} Specifically: {}...",
            TEMPLATED_LEAD,
            truncate_chars(context, TEMPLATED_EXCERPT_CHARS)
        )
    }
}

pub fn demo_answer(context: &str) -> String {
    if context.is_empty() {
        format!("{} {}", DEMO_LEAD, DEMO_EMPTY)
    } else {
        format!(
            "{} {}...",
            DEMO_LEAD,
            truncate_chars(context, DEMO_EXCERPT_CHARS)
        )
    }
}

/// Prefix of at most `max` chars, cut on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
