//! Validated runtime settings.
//!
//! [`Settings::from_cli`] turns the raw, all-optional [`Cli`] into the
//! configuration the pipeline runs with. It fails before any network call
//! when a required credential is missing.

use crate::cli::Cli;
use crate::summarizer::DEFAULT_MODELS;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Fatal configuration problems, reported before the pipeline starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("NEXT_PUBLIC_SUPABASE_URL and NEXT_PUBLIC_SUPABASE_ANON_KEY must be set")]
    MissingSupabase,

    #[error("GOOGLE_API_KEY must be set; check your .env.local file")]
    MissingGoogleKey,

    #[error("NEXT_PUBLIC_SUPABASE_URL is not a valid URL ({value}): {source}")]
    InvalidSupabaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("table name must not be empty")]
    EmptyTable,
}

/// Everything a run needs, with secrets present and the URL parsed.
pub struct Settings {
    pub supabase_url: Url,
    pub supabase_key: String,
    pub google_api_key: String,
    pub table: String,
    pub models: Vec<String>,
    pub cooldown: Duration,
    pub list_models: bool,
    pub dry_run: bool,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("supabase_url", &self.supabase_url.as_str())
            .field("supabase_key", &"<redacted>")
            .field("google_api_key", &"<redacted>")
            .field("table", &self.table)
            .field("models", &self.models)
            .field("cooldown", &self.cooldown)
            .field("list_models", &self.list_models)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Treat unset and blank values the same way.
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let (Some(raw_url), Some(supabase_key)) =
            (non_empty(cli.supabase_url), non_empty(cli.supabase_key))
        else {
            return Err(ConfigError::MissingSupabase);
        };
        let google_api_key = non_empty(cli.google_api_key).ok_or(ConfigError::MissingGoogleKey)?;

        let supabase_url =
            Url::parse(&raw_url).map_err(|source| ConfigError::InvalidSupabaseUrl {
                value: raw_url.clone(),
                source,
            })?;

        let table = cli.table.trim().to_string();
        if table.is_empty() {
            return Err(ConfigError::EmptyTable);
        }

        let mut models = cli
            .models
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>();
        if models.is_empty() {
            models = DEFAULT_MODELS.iter().map(|m| m.to_string()).collect();
        }

        Ok(Self {
            supabase_url,
            supabase_key,
            google_api_key,
            table,
            models,
            cooldown: Duration::from_secs(cli.cooldown_secs),
            list_models: !cli.skip_model_listing,
            dry_run: cli.dry_run,
        })
    }
}
