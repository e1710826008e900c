//! # AI News Digest
//!
//! A batch job that picks the most important AI story of the moment from a
//! handful of RSS feeds, has Gemini summarize it as a structured record,
//! and appends that record to a Supabase table.
//!
//! ## Usage
//!
//! ```sh
//! # credentials from the environment, .env.local or .env
//! ai_news_digest
//! ```
//!
//! ## Architecture
//!
//! Each invocation performs exactly one sequential pass:
//! 1. **Collecting**: fetch the fixed feed list, top 5 entries per feed
//! 2. **Summarizing**: one prompt, candidate models tried in order with a cooldown after rate limits
//! 3. **Persisting**: insert one row holding the summary and the full digest
//!
//! Only configuration problems produce a non-zero exit; failures inside the
//! pipeline are logged and the process still exits cleanly.

use clap::Parser;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod feeds;
mod models;
mod persist;
mod pipeline;
mod summarizer;
#[cfg(test)]
mod test_support;
mod utils;

use api::{FixedCooldown, GeminiClient};
use cli::Cli;
use config::Settings;
use feeds::{AI_NEWS_FEEDS, HttpFeedFetcher};
use persist::SupabaseStore;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "ai_news_digest starting up");

    // .env.local takes precedence over .env; neither overrides the real environment
    dotenvy::from_filename(".env.local").ok();
    dotenvy::dotenv().ok();

    let settings = match Settings::from_cli(Cli::parse()) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    info!(?settings, "Loaded configuration");

    let fetcher = HttpFeedFetcher::new()?;
    let genai = GeminiClient::new(settings.google_api_key.as_str())?;
    let store = SupabaseStore::new(
        &settings.supabase_url,
        settings.supabase_key.as_str(),
        &settings.table,
    )?;
    let backoff = FixedCooldown::new(settings.cooldown);

    let outcome = Pipeline {
        fetcher: &fetcher,
        feed_urls: AI_NEWS_FEEDS,
        genai: &genai,
        backoff: &backoff,
        models: &settings.models,
        store: &store,
        list_models: settings.list_models,
        dry_run: settings.dry_run,
    }
    .run()
    .await;

    let elapsed = start_time.elapsed();
    info!(
        ?outcome,
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
