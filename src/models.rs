//! Data models for collected articles and the generated digest.
//!
//! - [`Article`]: one normalized feed entry, handed to the summarizer
//! - [`NewsDigest`]: the model's pick of the most important story
//! - [`PersistedRecord`]: the row written to the datastore

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single feed entry, flattened to the fields the prompt needs.
///
/// Articles only live for the duration of one run. Nothing deduplicates
/// them across runs, so the same story fetched twice is summarized twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Article {
    /// Entry headline.
    pub title: String,
    /// Link to the full story.
    pub link: String,
    /// Plain-text excerpt; empty when the feed provides none.
    pub summary: String,
    /// RFC 3339 publication timestamp.
    pub published: String,
    /// Human readable name of the feed the entry came from.
    pub source: String,
}

/// The model's answer: one trending story, summarized.
///
/// The four named keys are required; the items of the two lists are kept as
/// raw JSON. Anything else the model adds is kept in `extra` and written back
/// out on serialization, so the stored object is the full object the model
/// returned.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsDigest {
    /// Short, catchy headline for the story.
    pub headline: String,
    /// Two or three sentence summary.
    pub summary: String,
    /// Bullet points; three are requested but neither count nor shape is enforced.
    pub key_points: Vec<Value>,
    /// The articles the digest draws on, usually links but sometimes objects
    /// such as `{"source": .., "link": ..}`. Stored as returned.
    pub sources: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One row of the daily news table.
#[derive(Debug, Serialize)]
pub struct PersistedRecord<'a> {
    /// Copy of [`NewsDigest::summary`].
    pub summary: &'a str,
    /// The whole digest, stored as structured JSON.
    pub sources: &'a NewsDigest,
}

impl<'a> From<&'a NewsDigest> for PersistedRecord<'a> {
    fn from(digest: &'a NewsDigest) -> Self {
        Self {
            summary: &digest.summary,
            sources: digest,
        }
    }
}
