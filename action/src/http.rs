//! HTTP client for the like API.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::{LikeApi, LikeApiError, LikeReport};

/// Placeholder substituted with the target UID in the URL template.
pub const UID_PLACEHOLDER: &str = "{uid}";

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Raw JSON response from the like API.
///
/// The API contract: `GET <template with uid>` returns a JSON object with
/// `PlayerNickname` (str) and the integers `LikesbeforeCommand`,
/// `LikesafterCommand` and `LikesGivenByAPI`.
/// Missing fields fall back to `"Unknown"` / `0`.
#[derive(Debug, Deserialize)]
struct LikeResponse {
    #[serde(rename = "PlayerNickname", default = "unknown_player")]
    player_nickname: String,
    #[serde(rename = "LikesbeforeCommand", default)]
    likes_before: u64,
    #[serde(rename = "LikesafterCommand", default)]
    likes_after: u64,
    #[serde(rename = "LikesGivenByAPI", default)]
    likes_given: u64,
}

fn unknown_player() -> String {
    "Unknown".to_string()
}

impl From<LikeResponse> for LikeReport {
    fn from(r: LikeResponse) -> Self {
        LikeReport {
            player_name: r.player_nickname,
            likes_before: r.likes_before,
            likes_after: r.likes_after,
            likes_added: r.likes_given,
        }
    }
}

/// Parse a like API response body.
pub(crate) fn parse_report(body: &[u8]) -> Result<LikeReport, LikeApiError> {
    let resp: LikeResponse = serde_json::from_slice(body)
        .map_err(|e| LikeApiError::InvalidResponse(format!("failed to parse like response: {e}")))?;
    Ok(resp.into())
}

/// Client for a like API addressed by a URL template such as
/// `https://api.example/like?uid={uid}`.
pub struct HttpLikeApi {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    url_template: String,
}

impl HttpLikeApi {
    /// Create a client. `url_template` must contain [`UID_PLACEHOLDER`].
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self, LikeApiError> {
        let url_template = url_template.into();
        if !url_template.contains(UID_PLACEHOLDER) {
            return Err(LikeApiError::Config(format!(
                "like API URL must contain {UID_PLACEHOLDER}: {url_template}"
            )));
        }
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| LikeApiError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            url_template,
        })
    }

    /// The URL requested for `target_uid`.
    pub fn url_for(&self, target_uid: &str) -> String {
        self.url_template.replace(UID_PLACEHOLDER, target_uid)
    }
}

#[async_trait]
impl LikeApi for HttpLikeApi {
    async fn send_like(&self, target_uid: &str) -> Result<LikeReport, LikeApiError> {
        let url = self.url_for(target_uid);

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                LikeApiError::Timeout(e.to_string())
            } else if e.is_connect() {
                LikeApiError::Unreachable(format!("connection failed: {e}"))
            } else {
                LikeApiError::RequestFailed(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(LikeApiError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                LikeApiError::Timeout(e.to_string())
            } else {
                LikeApiError::RequestFailed(format!("failed to read body: {e}"))
            }
        })?;
        parse_report(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = HttpLikeApi::new("https://api.example/like", Duration::from_secs(10));
        assert!(matches!(err, Err(LikeApiError::Config(_))));
    }

    #[test]
    fn url_substitutes_uid() {
        let api =
            HttpLikeApi::new("https://api.example/like?uid={uid}&r=ind", Duration::from_secs(10))
                .unwrap();
        assert_eq!(
            api.url_for("123456"),
            "https://api.example/like?uid=123456&r=ind"
        );
    }

    #[test]
    fn parses_full_response() {
        let body = br#"{"PlayerNickname":"Ace","LikesbeforeCommand":100,"LikesafterCommand":105,"LikesGivenByAPI":5}"#;
        let report = parse_report(body).unwrap();
        assert_eq!(
            report,
            LikeReport {
                player_name: "Ace".into(),
                likes_before: 100,
                likes_after: 105,
                likes_added: 5,
            }
        );
    }

    #[test]
    fn missing_fields_use_defaults() {
        let report = parse_report(br#"{"status": 2}"#).unwrap();
        assert_eq!(report.player_name, "Unknown");
        assert_eq!(report.likes_added, 0);
    }

    #[test]
    fn malformed_body_is_invalid_response() {
        assert!(matches!(
            parse_report(b"<html>bad gateway</html>"),
            Err(LikeApiError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        // Port 9 (discard) is essentially never listening on loopback.
        let api = HttpLikeApi::new("http://127.0.0.1:9/like?uid={uid}", Duration::from_secs(2))
            .unwrap();
        assert!(api.send_like("1").await.is_err());
    }
}
