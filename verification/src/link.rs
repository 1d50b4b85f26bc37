//! Challenge link shortening.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const SHORTEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Turns a long verification link into the one shown to the user.
///
/// Implementations return `None` when they cannot shorten; the caller then
/// falls back to the raw link.
#[async_trait]
pub trait LinkShortener: Send + Sync {
    async fn shorten(&self, link: &str) -> Option<String>;
}

/// Hands out the raw link unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectLinks;

#[async_trait]
impl LinkShortener for DirectLinks {
    async fn shorten(&self, _link: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(rename = "shortenedUrl")]
    shortened_url: Option<String>,
}

/// Client for shortener services with the `GET ?api=KEY&url=LINK` API,
/// answering `{"shortenedUrl": "..."}`.
pub struct HttpShortener {
    http_client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpShortener {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, String> {
        let http_client = reqwest::Client::builder()
            .timeout(SHORTEN_TIMEOUT)
            .build()
            .map_err(|e| format!("failed to create HTTP client: {e}"))?;
        Ok(Self {
            http_client,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }

    async fn request(&self, link: &str) -> Result<String, String> {
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[("api", self.api_key.as_str()), ("url", link)])
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP status {}", response.status()));
        }
        let body: ShortenResponse = response.json().await.map_err(|e| e.to_string())?;
        body.shortened_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| "response has no shortenedUrl".to_string())
    }
}

#[async_trait]
impl LinkShortener for HttpShortener {
    async fn shorten(&self, link: &str) -> Option<String> {
        match self.request(link).await {
            Ok(short) => Some(short),
            Err(e) => {
                tracing::warn!(error = %e, "link shortening failed, using raw link");
                None
            }
        }
    }
}
