//! Hacker News Firebase API client.
//!
//! Two read-only endpoints are used:
//! - `GET /v0/topstories.json` returns a JSON array of item ids
//! - `GET /v0/item/{id}.json` returns one item object (or `null`)

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::ApiSettings;
use crate::domain::ItemRecord;

use super::StorySource;

/// Errors from the Hacker News API
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Hacker News API client
pub struct HackerNewsClient {
    /// Base URL without trailing slash, e.g. https://hacker-news.firebaseio.com
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl HackerNewsClient {
    /// Create a new client
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self { base_url, client })
    }

    /// Create from settings
    pub fn from_settings(api: &ApiSettings) -> Result<Self, FetchError> {
        Self::new(api.base_url.clone(), Duration::from_secs(api.timeout_seconds))
    }

    /// Build API URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/v0/{}", self.base_url, path)
    }

    /// GET a URL and parse its body as JSON
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl StorySource for HackerNewsClient {
    fn name(&self) -> &str {
        "hackernews"
    }

    async fn top_story_ids(&self) -> Result<Vec<u64>, FetchError> {
        let url = self.api_url("topstories.json");
        let body = self.get_json(&url).await?;
        parse_id_list(&url, body)
    }

    async fn item(&self, id: u64) -> Result<ItemRecord, FetchError> {
        let url = self.api_url(&format!("item/{}.json", id));
        let body = self.get_json(&url).await?;
        parse_item(&url, body)
    }
}

/// Interpret a listing body as a sequence of integer ids
fn parse_id_list(url: &str, body: Value) -> Result<Vec<u64>, FetchError> {
    let malformed = |reason: String| FetchError::Malformed {
        url: url.to_string(),
        reason,
    };

    let Value::Array(values) = body else {
        return Err(malformed("expected a JSON array of ids".to_string()));
    };

    values
        .iter()
        .map(|v| {
            v.as_u64()
                .ok_or_else(|| malformed(format!("expected an integer id, found {}", v)))
        })
        .collect()
}

/// Interpret an item body. `null` (deleted or unknown item) becomes an empty record.
fn parse_item(url: &str, body: Value) -> Result<ItemRecord, FetchError> {
    match body {
        Value::Object(record) => Ok(record),
        Value::Null => Ok(ItemRecord::new()),
        other => Err(FetchError::Malformed {
            url: url.to_string(),
            reason: format!("expected a JSON object, found {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_url() {
        let client =
            HackerNewsClient::new("https://hacker-news.firebaseio.com/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.api_url("item/8863.json"),
            "https://hacker-news.firebaseio.com/v0/item/8863.json"
        );
    }

    #[test]
    fn test_parse_id_list() {
        let ids = parse_id_list("u", json!([3, 1, 2])).unwrap();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_parse_id_list_rejects_non_array() {
        let err = parse_id_list("u", json!({"ids": [1]})).unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[test]
    fn test_parse_id_list_rejects_non_integer() {
        assert!(parse_id_list("u", json!([1, "two"])).is_err());
    }

    #[test]
    fn test_parse_null_item_is_empty_record() {
        let record = parse_item("u", Value::Null).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_parse_item_rejects_scalars() {
        assert!(parse_item("u", json!(42)).is_err());
    }
}
