use std::time::Duration;

use http::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::Client;
use url::Url;

use crate::config::{Config, Credentials};
use crate::error::ConfigError;

/// Fields requested for every lead
pub const LEAD_FIELDS: &str = "id,created_time,field_data";

/// Build the first-page URL of the leads edge for one form
pub fn leads_url(
    config: &Config,
    credentials: &Credentials,
    since: Option<i64>,
) -> Result<Url, ConfigError> {
    let mut url = config.graph_base.clone();
    {
        let mut segments = url.path_segments_mut().map_err(|_| ConfigError::Invalid {
            name: "GRAPH_API_BASE",
            reason: "cannot be used as a base URL".to_string(),
        })?;
        segments
            .pop_if_empty()
            .push(&config.graph_version)
            .push(&credentials.form_id)
            .push("leads");
    }

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("access_token", &credentials.access_token)
            .append_pair("fields", LEAD_FIELDS)
            .append_pair("limit", &config.page_size.to_string());
        if let Some(since) = since {
            query.append_pair("since", &since.to_string());
        }
    }

    log::debug!("Leads URL: {}", redact(url.as_str()));
    Ok(url)
}

/// Create the HTTP client used for every page request
pub fn create_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    log::debug!("Setting up Graph API client with {:?} timeout", timeout);

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    log::debug!("Graph API client created successfully");
    Ok(client)
}

/// Mask the access token in a URL before it is logged
pub fn redact(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    if !parsed.query_pairs().any(|(k, _)| k == "access_token") {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "access_token" {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.to_string()
}
