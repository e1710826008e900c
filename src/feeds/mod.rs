//! Feed collection: the first stage of the pipeline.
//!
//! Every feed in [`AI_NEWS_FEEDS`] is fetched in order and its first
//! [`ENTRIES_PER_FEED`] entries are flattened into [`Article`]s.
//!
//! | Source | Feed |
//! |--------|------|
//! | TechCrunch | AI category |
//! | The Verge | AI section |
//! | New York Times | Artificial Intelligence |
//!
//! A feed that cannot be fetched or parsed is logged and skipped; it never
//! aborts the run.

pub mod http;

use crate::models::Article;
use crate::utils::html_to_text;
use chrono::Local;
use feed_rs::model::{Entry, Feed};
use futures::stream::{self, StreamExt};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub use http::HttpFeedFetcher;

/// The fixed list of feeds polled on every run, in order.
pub const AI_NEWS_FEEDS: &[&str] = &[
    "https://techcrunch.com/category/artificial-intelligence/feed/",
    "https://www.theverge.com/rss/ai/index.xml",
    "https://rss.nytimes.com/services/xml/rss/nyt/ArtificialIntelligence.xml",
];

/// Maximum number of entries taken from the top of each feed.
pub const ENTRIES_PER_FEED: usize = 5;

/// Errors raised while fetching or parsing a single feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("feed parse failed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Anything that can turn a feed URL into a parsed feed.
pub trait FetchFeed {
    async fn fetch_feed(&self, url: &str) -> Result<Feed, FeedError>;
}

/// Fetch every feed in order and collect up to [`ENTRIES_PER_FEED`] articles from each.
///
/// Feeds are fetched one after another. Failures are logged and produce no
/// articles for that feed.
///
/// # Arguments
///
/// * `fetcher` - Performs the HTTP fetch and parse of each feed
/// * `urls` - Feed URLs, in the order their articles should appear
///
/// # Returns
///
/// Articles grouped by feed in `urls` order, entries in feed order within
/// each group. Empty when every feed failed or had no entries, which means
/// there is nothing to summarize.
#[instrument(level = "info", skip_all, fields(feeds = urls.len()))]
pub async fn collect_articles<F: FetchFeed>(fetcher: &F, urls: &[&str]) -> Vec<Article> {
    let per_feed: Vec<Vec<Article>> = stream::iter(urls.iter().copied())
        .then(|url| async move {
            match fetcher.fetch_feed(url).await {
                Ok(feed) => {
                    let articles = articles_from_feed(url, &feed);
                    info!(%url, count = articles.len(), "Collected feed entries");
                    articles
                }
                Err(e) => {
                    error!(%url, error = %e, "Feed fetch failed; skipping");
                    Vec::new()
                }
            }
        })
        .collect()
        .await;

    let articles = per_feed.into_iter().flatten().collect::<Vec<_>>();
    info!(count = articles.len(), "Total articles collected");
    articles
}

/// Flatten the first [`ENTRIES_PER_FEED`] entries of a parsed feed.
///
/// Entries without a title or link are dropped, after the cap is applied.
pub fn articles_from_feed(url: &str, feed: &Feed) -> Vec<Article> {
    let source = source_name(url, feed);
    feed.entries
        .iter()
        .take(ENTRIES_PER_FEED)
        .filter_map(|entry| {
            let article = article_from_entry(&source, entry);
            if article.is_none() {
                warn!(%url, entry_id = %entry.id, "Entry has no title or link; skipping");
            }
            article
        })
        .collect()
}

fn article_from_entry(source: &str, entry: &Entry) -> Option<Article> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())?;
    let link = entry.links.first().map(|l| l.href.clone())?;
    let summary = entry
        .summary
        .as_ref()
        .map(|s| html_to_text(&s.content))
        .unwrap_or_default();
    let published = entry
        .published
        .or(entry.updated)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| Local::now().to_rfc3339());

    debug!(%title, %link, "Normalized entry");
    Some(Article {
        title,
        link,
        summary,
        published,
        source: source.to_string(),
    })
}

/// The feed's own title, or the host it was fetched from when it has none.
fn source_name(url: &str, feed: &Feed) -> String {
    feed.title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            Url::parse(url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
        })
        .unwrap_or_else(|| url.to_string())
}
