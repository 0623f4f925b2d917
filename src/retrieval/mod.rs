mod cursor;
mod progress;

use std::path::Path;
use std::time::Instant;

use log::{debug, info};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::FetchError;
use crate::lead::{LeadsPage, RawLead};

pub use self::cursor::{PageCursor, RetryPolicy};
use self::progress::setup_spinner;

/// How far and how persistently to follow the leads edge
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub max_pages: usize,
    pub retry: RetryPolicy,
    pub quiet: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            max_pages: 1000,
            retry: RetryPolicy::default(),
            quiet: true,
        }
    }
}

/// Fetch every page of leads starting at `first`, in API order.
///
/// All or nothing: a failure on any page discards what was already fetched.
pub async fn fetch_leads(
    client: &Client,
    first: Url,
    options: FetchOptions,
) -> Result<Vec<RawLead>, FetchError> {
    let start_time = Instant::now();
    let spinner = setup_spinner(options.quiet);

    let mut cursor = PageCursor::new(client, first, options.max_pages, options.retry);
    let mut leads = Vec::new();

    let result = loop {
        match cursor.next_page().await {
            Ok(Some(page)) => {
                if page.data.is_empty() {
                    info!("No data in page response");
                } else {
                    info!("Fetched {} items", page.data.len());
                }
                leads.extend(page.data);

                if let Some(pb) = &spinner {
                    pb.set_position(cursor.pages_fetched() as u64);
                    pb.set_message(format!("{} leads", leads.len()));
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    if let Some(pb) = spinner {
        match &result {
            Ok(()) => pb.finish_with_message(format!("{} leads", leads.len())),
            Err(_) => pb.abandon_with_message("fetch failed"),
        }
    }
    result?;

    info!(
        "Total raw leads fetched: {} from {} pages in {:.2?}",
        leads.len(),
        cursor.pages_fetched(),
        start_time.elapsed()
    );
    Ok(leads)
}

/// Load raw leads from a local file holding either a lead array or a full page
pub async fn load_sample(path: &Path) -> Result<Vec<RawLead>, FetchError> {
    debug!("Loading sample leads from {}", path.display());
    let sample_error = |reason: String| FetchError::Sample {
        path: path.to_path_buf(),
        reason,
    };

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| sample_error(e.to_string()))?;
    let value: Value = serde_json::from_slice(&content).map_err(|e| sample_error(e.to_string()))?;

    let leads = if value.is_array() {
        serde_json::from_value::<Vec<RawLead>>(value)
    } else {
        serde_json::from_value::<LeadsPage>(value).map(|page| page.data)
    }
    .map_err(|e| sample_error(e.to_string()))?;

    info!("Loaded {} sample leads", leads.len());
    Ok(leads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_sample_array_and_page() {
        let mut array = tempfile::NamedTempFile::new().unwrap();
        write!(array, r#"[{{"id":"1"}},{{"id":"2"}}]"#).unwrap();
        let leads = load_sample(array.path()).await.unwrap();
        assert_eq!(
            leads.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );

        let mut page = tempfile::NamedTempFile::new().unwrap();
        write!(page, r#"{{"data":[{{"id":"3"}}],"paging":{{}}}}"#).unwrap();
        let leads = load_sample(page.path()).await.unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].id, "3");
    }

    #[tokio::test]
    async fn test_load_sample_missing_file() {
        let err = load_sample(Path::new("/nonexistent/leads.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Sample { .. }));
    }
}
