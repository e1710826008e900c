//! Command-line interface definitions.
//!
//! Every option can also come from the environment (including `.env.local`
//! and `.env`, loaded before parsing), so a scheduled run needs no arguments
//! at all. Validation of the required credentials happens in
//! [`crate::config::Settings::from_cli`], not here, so that a missing key
//! produces a descriptive message instead of a usage error.

use clap::Parser;

/// Command-line arguments for one digest run.
///
/// # Examples
///
/// ```sh
/// # Everything from the environment
/// ai_news_digest
///
/// # Summarize and print, but do not insert
/// ai_news_digest --dry-run
///
/// # Custom candidate list and a shorter cooldown
/// ai_news_digest --models gemini-pro-latest,gemini-flash-latest --cooldown-secs 10
/// ```
#[derive(Parser, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Supabase project URL
    #[arg(long, env = "NEXT_PUBLIC_SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase API key
    #[arg(long, env = "NEXT_PUBLIC_SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    /// Google Generative Language API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Table the digest row is appended to
    #[arg(long, env = "DAILY_NEWS_TABLE", default_value = crate::persist::DEFAULT_TABLE)]
    pub table: String,

    /// Candidate models, comma separated, tried in order
    #[arg(long, env = "GENAI_MODELS", value_delimiter = ',')]
    pub models: Vec<String>,

    /// Seconds to wait after a rate-limited model before trying the next one
    #[arg(long, env = "GENAI_COOLDOWN_SECS", default_value_t = 40)]
    pub cooldown_secs: u64,

    /// Skip logging the list of models the API key can access
    #[arg(long)]
    pub skip_model_listing: bool,

    /// Log the digest instead of inserting it
    #[arg(long)]
    pub dry_run: bool,
}
