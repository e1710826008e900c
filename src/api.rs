//! Generative-language API access and the cooldown policy between candidates.
//!
//! # Architecture
//!
//! - [`GenerateJson`]: the seam the summarizer talks to
//! - [`GeminiClient`]: implementation against Google's Generative Language REST API
//! - [`Backoff`]: decides how long to wait after a failed candidate model
//! - [`FixedCooldown`]: waits a fixed delay after rate-limit errors only
//!
//! The API key travels in the `x-goog-api-key` header, never in the URL, so
//! request URLs are safe to log.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, instrument, warn};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const MODELS_PAGE_SIZE: &str = "100";

/// Cooldown applied after a rate-limited candidate.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(40);

/// Errors from a single model-API call.
#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("{endpoint} is rate limited: {body}")]
    RateLimited { endpoint: String, body: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned no text candidates")]
    EmptyResponse { endpoint: String },

    #[error("{endpoint} returned a malformed digest: {source}")]
    MalformedDigest {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GenAiError {
    /// True for HTTP 429 class failures.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GenAiError::RateLimited { .. })
    }
}

/// A model client able to produce JSON-constrained completions.
pub trait GenerateJson {
    /// Ask `model` for a completion of `prompt`, constrained to JSON output.
    ///
    /// Returns the raw text of the first candidate.
    async fn generate_json(&self, model: &str, prompt: &str) -> Result<String, GenAiError>;

    /// Names of every model the credentials can access.
    async fn list_models(&self) -> Result<Vec<String>, GenAiError>;
}

/// Policy consulted after a candidate model fails.
///
/// `Some(delay)` means wait that long before the next candidate; `None`
/// means move on immediately.
pub trait Backoff {
    fn delay_after(&self, error: &GenAiError) -> Option<Duration>;
}

/// Waits a fixed delay after rate-limit errors and not at all otherwise.
#[derive(Debug, Clone, Copy)]
pub struct FixedCooldown {
    delay: Duration,
}

impl FixedCooldown {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for FixedCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl Backoff for FixedCooldown {
    fn delay_after(&self, error: &GenAiError) -> Option<Duration> {
        error.is_rate_limited().then_some(self.delay)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate, if any.
    fn first_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text = parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<String>();
        (!text.is_empty()).then_some(text)
    }
}

/// Client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, api_key, GEMINI_API_BASE))
    }

    fn with_client(client: Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    fn generate_endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    /// Read the body of a non-success response and classify it.
    async fn status_error(endpoint: String, resp: reqwest::Response) -> GenAiError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        classify_status(endpoint, status, body)
    }
}

/// Map a non-success HTTP status to the matching error variant.
///
/// Only `429 Too Many Requests` is a rate limit; every other status,
/// including 5xx, is a plain [`GenAiError::Status`].
///
/// # Arguments
///
/// * `endpoint` - The endpoint that answered, kept for the error message
/// * `status` - The HTTP status of the response
/// * `body` - The response body, usually a JSON error document
pub fn classify_status(endpoint: String, status: StatusCode, body: String) -> GenAiError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        GenAiError::RateLimited { endpoint, body }
    } else {
        GenAiError::Status {
            endpoint,
            status: status.as_u16(),
            body,
        }
    }
}

impl GenerateJson for GeminiClient {
    #[instrument(level = "info", skip(self, prompt), fields(prompt_bytes = prompt.len()))]
    async fn generate_json(&self, model: &str, prompt: &str) -> Result<String, GenAiError> {
        let endpoint = self.generate_endpoint(model);
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [TextPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let t0 = Instant::now();
        let resp = self
            .client
            .post(&endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| GenAiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            let err = Self::status_error(endpoint, resp).await;
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %err, "API call failed");
            return Err(err);
        }

        let parsed: GenerateContentResponse =
            resp.json().await.map_err(|source| GenAiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        info!(elapsed_ms = t0.elapsed().as_millis() as u64, "API call succeeded");
        parsed
            .first_text()
            .ok_or(GenAiError::EmptyResponse { endpoint })
    }

    #[instrument(level = "info", skip_all)]
    async fn list_models(&self) -> Result<Vec<String>, GenAiError> {
        let endpoint = format!("{}/models", self.base_url);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .client
                .get(&endpoint)
                .header("x-goog-api-key", &self.api_key)
                .query(&[("pageSize", MODELS_PAGE_SIZE)]);
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }

            let resp = req.send().await.map_err(|source| GenAiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
            if !resp.status().is_success() {
                return Err(Self::status_error(endpoint, resp).await);
            }
            let page: ModelList = resp.json().await.map_err(|source| GenAiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

            names.extend(page.models.into_iter().map(|m| m.name));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(names)
    }
}

/// Log the name of every accessible model.
///
/// Purely diagnostic: failures are logged and otherwise ignored.
#[instrument(level = "info", skip_all)]
pub async fn log_available_models<G: GenerateJson>(client: &G) {
    info!("Listing available models");
    match client.list_models().await {
        Ok(names) => {
            for name in &names {
                info!(model = %name, "Available model");
            }
            info!(count = names.len(), "Listed available models");
        }
        Err(e) => warn!(error = %e, "Failed to list models"),
    }
}
