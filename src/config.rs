use std::path::PathBuf;

use chrono::{DateTime, NaiveDate};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_API_VERSION: &str = "v16.0";
pub const DEFAULT_DB_PATH: &str = "data/seen_leads.db";
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Settings read from the process environment (and `.env`, if present)
#[derive(Debug, Clone)]
pub struct Config {
    pub access_token: Option<String>,
    pub form_id: Option<String>,
    pub graph_base: Url,
    pub graph_version: String,
    pub db_path: PathBuf,
    pub page_size: u32,
}

/// Credentials needed to talk to the Graph API
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub form_id: String,
}

impl Config {
    /// Load `.env` and read the configuration from the real environment
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenv::dotenv() {
            Ok(path) => log::debug!("Loaded environment from {}", path.display()),
            Err(e) => log::debug!("No .env file loaded: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_str = get("GRAPH_API_BASE").unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string());
        let graph_base = Url::parse(&base_str).map_err(|e| ConfigError::Invalid {
            name: "GRAPH_API_BASE",
            reason: e.to_string(),
        })?;
        if graph_base.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                name: "GRAPH_API_BASE",
                reason: format!("'{}' cannot be used as a base URL", base_str),
            });
        }

        let page_size = match get("PAGE_SIZE") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "PAGE_SIZE",
                        reason: format!("expected a positive integer, got '{}'", raw),
                    });
                }
            },
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Config {
            access_token: get("META_ACCESS_TOKEN"),
            form_id: get("LEAD_FORM_ID"),
            graph_base,
            graph_version: get("GRAPH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_VERSION.to_string()),
            db_path: get("DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            page_size,
        })
    }

    /// Access token and form id, or a configuration error naming the missing one
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let access_token = self
            .access_token
            .clone()
            .ok_or(ConfigError::Missing("META_ACCESS_TOKEN"))?;
        let form_id = self
            .form_id
            .clone()
            .ok_or(ConfigError::Missing("LEAD_FORM_ID"))?;
        Ok(Credentials {
            access_token,
            form_id,
        })
    }
}

/// Parse a `--since` value into unix seconds.
///
/// Accepts RFC 3339, the Graph API's own `2025-11-01T10:35:00+0000` form,
/// a bare `YYYY-MM-DD` date (midnight UTC) or an integer timestamp.
pub fn parse_since(raw: &str) -> Result<i64, ConfigError> {
    let raw = raw.trim();
    if let Ok(ts) = raw.parse::<i64>() {
        return Ok(ts);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(dt.timestamp());
    }
    if let Some(dt) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(dt.and_utc().timestamp());
    }
    Err(ConfigError::Invalid {
        name: "--since",
        reason: format!("'{}' is not a recognised timestamp", raw),
    })
}
