//! Remote metadata store client. The store is a small HTTP service with a
//! flat lesson namespace: `GET /lessons/{key}` fetches one record, `POST
//! /lessons` publishes one (optionally under a caller-chosen id plus alias
//! keys, so the same record is reachable by pool id and by content id).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::metadata::content::LessonMetadata;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Publish payload. Omitted `id` asks the store to generate one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub metadata: LessonMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PublishResponse {
    id: String,
}

/// Read/publish access to a remote metadata store.
///
/// `fetch` distinguishes a definite miss (`Ok(None)`) from a transport or
/// protocol failure (`Err`); the resolver downgrades the latter to a miss,
/// but other callers may want the difference.
pub trait RemoteMetadataStore: Send + Sync {
    fn fetch(&self, key: &str) -> impl Future<Output = Result<Option<LessonMetadata>>> + Send;

    /// Publish a record, returning the id it is stored under.
    fn publish(&self, request: &PublishRequest) -> impl Future<Output = Result<String>> + Send;
}

/// HTTP-backed remote store.
pub struct HttpMetadataStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMetadataStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn lesson_url(&self, key: &str) -> String {
        format!("{}/lessons/{}", self.base_url, encode_key(key))
    }
}

impl RemoteMetadataStore for HttpMetadataStore {
    async fn fetch(&self, key: &str) -> Result<Option<LessonMetadata>> {
        let response = self
            .client
            .get(self.lesson_url(key))
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Query(format!(
                "metadata store returned {} for key {key}",
                response.status()
            )));
        }
        let metadata = response
            .json::<LessonMetadata>()
            .await
            .map_err(|e| Error::Query(e.to_string()))?;
        Ok(Some(metadata))
    }

    async fn publish(&self, request: &PublishRequest) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/lessons", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Query(format!(
                "metadata store rejected publish: {}",
                response.status()
            )));
        }
        let body = response
            .json::<PublishResponse>()
            .await
            .map_err(|e| Error::Query(e.to_string()))?;
        Ok(body.id)
    }
}

/// Percent-encode a lesson key for use as a single path segment.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_path_safe() {
        assert_eq!(encode_key("lesson-42"), "lesson-42");
        assert_eq!(encode_key("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_key("ünïcode"), "%C3%BCn%C3%AFcode");
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let store = HttpMetadataStore::new("http://localhost:3000/api/").unwrap();
        assert_eq!(
            store.lesson_url("7"),
            "http://localhost:3000/api/lessons/7"
        );
    }

    #[test]
    fn publish_request_omits_empty_fields() {
        let request = PublishRequest {
            id: None,
            metadata: LessonMetadata::default(),
            aliases: Vec::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("aliases").is_none());

        let request = PublishRequest {
            id: Some("lesson-1".into()),
            aliases: vec!["1".into()],
            ..request
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["id"], "lesson-1");
        assert_eq!(json["aliases"][0], "1");
    }
}
