use std::time::Duration;

use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::FetchError;
use crate::graph::redact;
use crate::lead::LeadsPage;

/// Longest error body kept in a `FetchError::Status` message
const MAX_ERROR_BODY: usize = 512;

/// Bounded retry with exponential backoff for idempotent page requests
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Walks the `paging.next` chain one page at a time.
///
/// The cursor stops for good once the server omits a next link, the page cap
/// is reached, or a request fails.
pub struct PageCursor<'a> {
    client: &'a Client,
    next: Option<String>,
    pages_fetched: usize,
    max_pages: usize,
    retry: RetryPolicy,
}

impl<'a> PageCursor<'a> {
    pub fn new(client: &'a Client, first: Url, max_pages: usize, retry: RetryPolicy) -> Self {
        PageCursor {
            client,
            next: Some(first.to_string()),
            pages_fetched: 0,
            max_pages,
            retry,
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page, or `None` once the chain is exhausted
    pub async fn next_page(&mut self) -> Result<Option<LeadsPage>, FetchError> {
        let Some(next) = self.next.take() else {
            return Ok(None);
        };

        if self.pages_fetched >= self.max_pages {
            warn!(
                "Stopping after {} pages; the server still reports more (raise --max-pages to continue)",
                self.pages_fetched
            );
            return Ok(None);
        }

        let url = Url::parse(&next).map_err(|e| FetchError::Malformed {
            url: redact(&next),
            reason: format!("invalid paging.next link: {}", e),
        })?;

        let page = self.get_with_retry(&url).await?;
        self.pages_fetched += 1;
        self.next = page.next_url().map(str::to_string);
        debug!(
            "Page {}: {} leads, next page {}",
            self.pages_fetched,
            page.data.len(),
            if self.next.is_some() { "present" } else { "absent" }
        );
        Ok(Some(page))
    }

    async fn get_with_retry(&self, url: &Url) -> Result<LeadsPage, FetchError> {
        let mut attempt = 0;
        loop {
            match get_page(self.client, url).await {
                Ok(page) => return Ok(page),
                Err(e) if attempt < self.retry.max_retries && e.is_retryable() => {
                    let delay = self.retry.backoff(attempt);
                    attempt += 1;
                    warn!(
                        "{} (attempt {}/{}), retrying in {:?}",
                        e,
                        attempt,
                        self.retry.max_retries + 1,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

async fn get_page(client: &Client, url: &Url) -> Result<LeadsPage, FetchError> {
    let shown = redact(url.as_str());
    log::info!("Fetching: {}", shown);

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| FetchError::Transport {
            url: shown.clone(),
            source: e.without_url(),
        })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|e| FetchError::Transport {
        url: shown.clone(),
        source: e.without_url(),
    })?;
    debug!("Read {} bytes from {}", body.len(), shown);

    if !status.is_success() {
        return Err(FetchError::Status {
            url: shown,
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
        url: shown,
        reason: e.to_string(),
    })
}

/// Prefer the Graph API's `error.message`, fall back to the raw body
fn error_message(body: &[u8]) -> String {
    let graph_message = serde_json::from_slice::<Value>(body).ok().and_then(|v| {
        v.get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    if let Some(message) = graph_message {
        return message;
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "<empty body>".to_string();
    }
    text.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_error_message_prefers_graph_error() {
        let body = br#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#;
        assert_eq!(error_message(body), "Invalid OAuth access token.");
        assert_eq!(error_message(b"  bad gateway \n"), "bad gateway");
        assert_eq!(error_message(b""), "<empty body>");
    }
}
