//! Writing the digest to Supabase.
//!
//! Supabase exposes every table through PostgREST, so an insert is a single
//! `POST {base}/rest/v1/{table}` carrying the project key both as `apikey`
//! and as a bearer token. The table is append-only from this job's point of
//! view: no upsert, no uniqueness constraint.
//!
//! # Row layout
//!
//! | Column | Value |
//! |--------|-------|
//! | `summary` | the digest's summary text |
//! | `sources` | the entire digest as JSON |

use crate::models::{NewsDigest, PersistedRecord};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, instrument};
use url::Url;

/// Default table the digest is appended to.
pub const DEFAULT_TABLE: &str = "daily_ai_news";

const STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while inserting a row.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("insert rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid datastore endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Somewhere a digest row can be appended.
pub trait DigestStore {
    async fn insert(&self, record: &PersistedRecord<'_>) -> Result<(), StoreError>;
}

/// PostgREST endpoint for `table` under a Supabase project URL.
///
/// Any path already on `base` is kept, so projects served behind a proxy
/// prefix resolve correctly.
///
/// # Arguments
///
/// * `base` - The Supabase project URL
/// * `table` - Name of the table rows are appended to
///
/// # Returns
///
/// `{base}/rest/v1/{table}`, or [`StoreError::Endpoint`] if the joined URL
/// does not parse.
pub fn rest_endpoint(base: &Url, table: &str) -> Result<Url, StoreError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join("rest/v1/")?.join(table)?)
}

/// Inserts rows through Supabase's REST interface.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl SupabaseStore {
    pub fn new(base: &Url, api_key: impl Into<String>, table: &str) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(STORE_TIMEOUT).build()?;
        Self::with_client(client, base, api_key, table)
    }

    fn with_client(
        client: Client,
        base: &Url,
        api_key: impl Into<String>,
        table: &str,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            client,
            endpoint: rest_endpoint(base, table)?,
            api_key: api_key.into(),
        })
    }
}

/// Turn the status of an insert response into a result.
///
/// PostgREST answers `201 Created` for a minimal insert; any non-2xx status
/// is a rejection carrying the response body.
fn check_insert_status(status: StatusCode, body: String) -> Result<(), StoreError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(StoreError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

impl DigestStore for SupabaseStore {
    #[instrument(level = "info", skip_all, fields(endpoint = %self.endpoint))]
    async fn insert(&self, record: &PersistedRecord<'_>) -> Result<(), StoreError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .post(self.endpoint.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return check_insert_status(status, body);
        }
        info!(status = status.as_u16(), elapsed_ms = t0.elapsed().as_millis() as u64, "Row inserted");
        Ok(())
    }
}

/// Append one row for `digest`. Failures are logged and not retried.
///
/// # Arguments
///
/// * `store` - Where the row is written
/// * `digest` - The digest to persist; its summary and the whole object form the row
///
/// # Returns
///
/// `true` if the row was written, `false` if the insert failed for any reason.
#[instrument(level = "info", skip_all, fields(headline = %digest.headline))]
pub async fn save_digest<S: DigestStore>(store: &S, digest: &NewsDigest) -> bool {
    info!("Saving digest");
    match store.insert(&PersistedRecord::from(digest)).await {
        Ok(()) => {
            info!("Successfully saved digest");
            true
        }
        Err(e) => {
            error!(error = %e, "Failed to save digest");
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::{serve, stub_http_client};
    use serde_json::Value;
    use std::cell::RefCell;

    /// Captures every inserted row as JSON; optionally rejects them all.
    #[derive(Default)]
    pub(crate) struct RecordingStore {
        pub(crate) rows: RefCell<Vec<Value>>,
        pub(crate) reject: bool,
    }

    impl DigestStore for RecordingStore {
        async fn insert(&self, record: &PersistedRecord<'_>) -> Result<(), StoreError> {
            self.rows
                .borrow_mut()
                .push(serde_json::to_value(record).expect("record serializes"));
            if self.reject {
                return Err(StoreError::Rejected {
                    status: 401,
                    body: "Invalid API key".to_string(),
                });
            }
            Ok(())
        }
    }

    fn digest() -> NewsDigest {
        serde_json::from_str(
            r#"{"headline":"H","summary":"S","key_points":["p1","p2","p3"],"sources":["u1"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_rest_endpoint() {
        let base = Url::parse("https://abc.supabase.co").unwrap();
        assert_eq!(
            rest_endpoint(&base, DEFAULT_TABLE).unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/daily_ai_news"
        );
    }

    #[test]
    fn test_rest_endpoint_keeps_base_path() {
        let base = Url::parse("http://localhost:8000/proxy").unwrap();
        assert_eq!(
            rest_endpoint(&base, "news").unwrap().as_str(),
            "http://localhost:8000/proxy/rest/v1/news"
        );
    }

    #[tokio::test]
    async fn test_save_digest_writes_one_row() {
        let store = RecordingStore::default();
        assert!(save_digest(&store, &digest()).await);

        let rows = store.rows.borrow();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["summary"], "S");
        assert_eq!(rows[0]["sources"]["headline"], "H");
    }

    #[tokio::test]
    async fn test_save_digest_failure_is_not_retried() {
        let store = RecordingStore {
            reject: true,
            ..Default::default()
        };
        assert!(!save_digest(&store, &digest()).await);
        assert_eq!(store.rows.borrow().len(), 1);
    }

    #[test]
    fn test_check_insert_status() {
        assert!(check_insert_status(StatusCode::CREATED, String::new()).is_ok());
        assert!(check_insert_status(StatusCode::NO_CONTENT, String::new()).is_ok());

        let err = check_insert_status(StatusCode::UNAUTHORIZED, "Invalid API key".to_string())
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 401, ref body } if body == "Invalid API key"));
    }

    fn stub_store(base: &str) -> SupabaseStore {
        let base = Url::parse(base).unwrap();
        SupabaseStore::with_client(stub_http_client(), &base, "anon-key", DEFAULT_TABLE).unwrap()
    }

    #[tokio::test]
    async fn test_insert_posts_minimal_row_with_key_headers() {
        let (base, server) = serve(vec![(201, String::new())]).await;
        let digest = digest();

        stub_store(&base)
            .insert(&PersistedRecord::from(&digest))
            .await
            .unwrap();

        let requests = server.await.unwrap();
        let request = &requests[0];
        assert!(request.starts_with("POST /rest/v1/daily_ai_news "));
        let headers = request.to_lowercase();
        assert!(headers.contains("apikey: anon-key"));
        assert!(headers.contains("authorization: bearer anon-key"));
        assert!(headers.contains("prefer: return=minimal"));
        let body: Value = serde_json::from_str(request.split("\r\n\r\n").nth(1).unwrap()).unwrap();
        assert_eq!(body["summary"], "S");
        assert_eq!(body["sources"]["key_points"], serde_json::json!(["p1", "p2", "p3"]));
    }

    #[tokio::test]
    async fn test_insert_maps_http_401_to_rejected() {
        let (base, _server) = serve(vec![(401, r#"{"message":"Invalid API key"}"#.to_string())]).await;
        let digest = digest();

        let err = stub_store(&base)
            .insert(&PersistedRecord::from(&digest))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Rejected { status: 401, ref body } if body.contains("Invalid API key")));
    }

    #[tokio::test]
    async fn test_save_digest_reports_server_error() {
        let (base, server) = serve(vec![(500, String::new())]).await;
        assert!(!save_digest(&stub_store(&base), &digest()).await);
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[test]
    fn test_debug_redacts_key() {
        let base = Url::parse("https://abc.supabase.co").unwrap();
        let store = SupabaseStore::new(&base, "anon-key", DEFAULT_TABLE).unwrap();
        assert!(!format!("{:?}", store).contains("anon-key"));
    }
}
