//! Prompt construction and the candidate-model fallback loop.
//!
//! The summarizer sends one prompt containing every collected article to
//! each candidate model in turn, stopping at the first answer that parses
//! as a [`NewsDigest`]. Between failed candidates it asks a [`Backoff`]
//! policy whether to wait; the default waits 40 seconds after a rate limit
//! and moves on immediately after anything else. A model is never retried.

use crate::api::{Backoff, GenAiError, GenerateJson};
use crate::models::{Article, NewsDigest};
use crate::utils::{looks_truncated, truncate_for_log};
use itertools::Itertools;
use serde_json::Value;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Candidate models, tried in this order.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-flash-latest",
    "gemini-pro-latest",
    "gemini-2.0-flash-lite-001",
];

const PROMPT_TEMPLATE: &str = r#"You are an AI news curator. Below is a list of recent AI news articles.
Identify the single most important or trending story in the list and write a tl;dr of it.

Respond with a JSON object with exactly these keys:
- "headline": a short, catchy headline for the trending story.
- "summary": a 2-3 sentence summary of the news.
- "key_points": an array of 3 bullet points.
- "sources": an array of the relevant links from the articles below.

Articles:
"#;

/// Render the articles into the prompt sent to every candidate model.
pub fn build_prompt(articles: &[Article]) -> String {
    let articles_text = articles
        .iter()
        .map(|a| {
            format!(
                "Title: {}\nSource: {}\nLink: {}\nSummary: {}",
                a.title, a.source, a.link, a.summary
            )
        })
        .join("\n\n");
    format!("{PROMPT_TEMPLATE}{articles_text}\n")
}

/// Parse a model answer into a digest.
///
/// JSON mode occasionally wraps the object in a one-element array; the first
/// element is used in that case.
pub fn parse_digest(text: &str) -> Result<NewsDigest, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;
    let object = match value {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    };
    serde_json::from_value(object)
}

/// Walks the candidate list until one model produces a usable digest.
pub struct Summarizer<'a, G, B> {
    client: &'a G,
    backoff: &'a B,
    models: &'a [String],
}

impl<'a, G, B> Summarizer<'a, G, B>
where
    G: GenerateJson,
    B: Backoff,
{
    pub fn new(client: &'a G, backoff: &'a B, models: &'a [String]) -> Self {
        Self {
            client,
            backoff,
            models,
        }
    }

    /// Produce a digest of `articles` from the first candidate that answers well.
    ///
    /// Candidates are tried once each, in order. After a failure the backoff
    /// policy decides whether to sleep before the next one.
    ///
    /// # Arguments
    ///
    /// * `articles` - Everything collected this run; all of it goes into one prompt
    ///
    /// # Returns
    ///
    /// The first digest that parses, or `None` if every candidate failed.
    #[instrument(level = "info", skip_all, fields(articles = articles.len(), candidates = self.models.len()))]
    pub async fn summarize(&self, articles: &[Article]) -> Option<NewsDigest> {
        let prompt = build_prompt(articles);
        let t0 = Instant::now();

        for model in self.models {
            info!(%model, "Trying model");
            let err = match self.try_model(model, &prompt).await {
                Ok(digest) => {
                    info!(
                        %model,
                        headline = %digest.headline,
                        elapsed_ms_total = t0.elapsed().as_millis() as u64,
                        "Digest generated"
                    );
                    return Some(digest);
                }
                Err(e) => e,
            };

            match self.backoff.delay_after(&err) {
                Some(delay) => {
                    warn!(%model, ?delay, error = %err, "Model failed; cooling down before next candidate");
                    sleep(delay).await;
                }
                None => {
                    error!(%model, error = %err, "Model failed; trying next candidate");
                }
            }
        }

        error!(
            candidates = self.models.len(),
            elapsed_ms_total = t0.elapsed().as_millis() as u64,
            "Failed to generate a digest with every candidate model"
        );
        None
    }

    async fn try_model(&self, model: &str, prompt: &str) -> Result<NewsDigest, GenAiError> {
        let text = self.client.generate_json(model, prompt).await?;
        parse_digest(&text).map_err(|source| {
            warn!(
                %model,
                truncated = looks_truncated(&source),
                response_preview = %truncate_for_log(&text, 300),
                "Model returned non-conforming JSON"
            );
            GenAiError::MalformedDigest {
                endpoint: format!("models/{model}:generateContent"),
                source,
            }
        })
    }
}
