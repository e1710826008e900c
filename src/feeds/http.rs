//! HTTP-backed feed fetcher.

use super::{FeedError, FetchFeed};
use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const FEED_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Fetches feeds over plain HTTP(S) GET and parses them with `feed-rs`.
#[derive(Debug, Clone)]
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(FEED_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchFeed for HttpFeedFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch_feed(&self, url: &str) -> Result<Feed, FeedError> {
        let t0 = Instant::now();
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        let feed = parser::parse(bytes.as_ref())?;
        debug!(
            bytes = bytes.len(),
            entries = feed.entries.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Parsed feed"
        );
        Ok(feed)
    }
}
