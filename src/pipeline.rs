//! One collect → summarize → persist pass.
//!
//! ```text
//! Start → Collecting ─(no articles)→ End
//!             │
//!             ▼
//!        Summarizing ─(no digest)→ End
//!             │
//!             ▼
//!        Persisting → End
//! ```
//!
//! No state is revisited and nothing is retried across stages.

use crate::api::{Backoff, GenerateJson, log_available_models};
use crate::feeds::{FetchFeed, collect_articles};
use crate::persist::{DigestStore, save_digest};
use crate::summarizer::Summarizer;
use tracing::{info, instrument, warn};

/// Which terminal state a run ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every feed failed or was empty.
    NoArticles,
    /// Every candidate model failed.
    NoDigest,
    /// A digest was produced but the insert failed.
    PersistFailed,
    /// A digest was produced and written.
    Persisted,
    /// A digest was produced and only logged.
    DryRun,
}

/// The collaborators and options for a single run.
pub struct Pipeline<'a, F, G, B, S> {
    pub fetcher: &'a F,
    pub feed_urls: &'a [&'a str],
    pub genai: &'a G,
    pub backoff: &'a B,
    pub models: &'a [String],
    pub store: &'a S,
    pub list_models: bool,
    pub dry_run: bool,
}

impl<F, G, B, S> Pipeline<'_, F, G, B, S>
where
    F: FetchFeed,
    G: GenerateJson,
    B: Backoff,
    S: DigestStore,
{
    #[instrument(level = "info", skip_all, fields(dry_run = self.dry_run))]
    pub async fn run(&self) -> RunOutcome {
        info!("Fetching news from RSS feeds");
        let articles = collect_articles(self.fetcher, self.feed_urls).await;
        if articles.is_empty() {
            warn!("No articles found");
            return RunOutcome::NoArticles;
        }

        if self.list_models {
            log_available_models(self.genai).await;
        }

        info!(count = articles.len(), "Generating digest");
        let summarizer = Summarizer::new(self.genai, self.backoff, self.models);
        let Some(digest) = summarizer.summarize(&articles).await else {
            return RunOutcome::NoDigest;
        };

        if self.dry_run {
            match serde_json::to_string_pretty(&digest) {
                Ok(json) => info!(digest = %json, "Dry run; not saving digest"),
                Err(e) => warn!(error = %e, "Dry run; digest could not be rendered"),
            }
            return RunOutcome::DryRun;
        }

        if save_digest(self.store, &digest).await {
            RunOutcome::Persisted
        } else {
            RunOutcome::PersistFailed
        }
    }
}
