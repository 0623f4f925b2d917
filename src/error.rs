use std::path::PathBuf;

use thiserror::Error;

/// Invalid or missing settings, detected before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set. Copy .env.sample to .env and fill it in, or pass --sample")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Failure while talking to the Graph API. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} returned {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
    #[error("failed to read sample file {path}: {reason}")]
    Sample { path: PathBuf, reason: String },
}

/// The seen-set database could not be opened, read or written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create directory for seen-set database {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("seen-set database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// The output file could not be rendered or written.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize leads: {0}")]
    Render(String),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<csv::Error> for ExportError {
    fn from(e: csv::Error) -> Self {
        ExportError::Render(e.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Render(e.to_string())
    }
}

/// Top-level error for one run of the pipeline.
#[derive(Debug, Error)]
pub enum LeadsError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

impl FetchError {
    /// Throttling, server-side failures and transport errors may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            FetchError::Malformed { .. } | FetchError::Sample { .. } => false,
        }
    }
}
