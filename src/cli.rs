use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[clap(name = "json")]
    Json,
    #[clap(name = "csv")]
    Csv,
}

impl OutputFormat {
    /// File extension used for the default output path
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }

    /// Default output file, relative to the working directory
    pub fn default_path(self) -> PathBuf {
        PathBuf::from(format!("new_leads.{}", self.extension()))
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(
    author,
    version,
    about = "Fetch new Meta Lead Ads submissions and export them to JSON or CSV"
)]
pub struct Cli {
    /// Output format
    #[clap(long, required = true)]
    pub output: OutputFormat,

    /// Output file path (defaults to new_leads.<format>)
    #[clap(long)]
    pub out: Option<PathBuf>,

    /// Path to the seen-leads database (overrides DB_PATH)
    #[clap(long)]
    pub db: Option<PathBuf>,

    /// Only fetch leads created after this timestamp (e.g. 2025-07-01T00:00:00+0000)
    #[clap(long)]
    pub since: Option<String>,

    /// Maximum number of pages to follow
    #[clap(long("max-pages"), default_value = "1000")]
    pub max_pages: usize,

    /// Retries for throttled or failed requests (0 disables retrying)
    #[clap(long, default_value = "2")]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[clap(long, default_value = "30")]
    pub timeout: u64,

    /// Load raw leads from a local JSON file instead of calling the API
    #[clap(long)]
    pub sample: Option<PathBuf>,

    /// Fetch and filter only; write neither the output file nor the database
    #[clap(long("dry-run"))]
    pub dry_run: bool,

    /// Drop leads that have neither an email nor a phone number
    #[clap(long("require-contact"))]
    pub require_contact: bool,

    /// Quiet mode, suppress progress output
    #[clap(long)]
    pub quiet: bool,

    /// Debug mode, enable verbose logging
    #[clap(long)]
    pub debug: bool,
}
