//! Telegram Bot API notifier.

use async_trait::async_trait;
use likegate_types::ReplyTarget;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Notifier, NotifyError};

/// Public Bot API endpoint.
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    reply_to_message_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Replies to the original command message via `sendMessage`.
pub struct TelegramNotifier {
    http_client: reqwest::Client,
    endpoint: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str) -> Result<Self, NotifyError> {
        Self::with_api_base(DEFAULT_TELEGRAM_API, bot_token)
    }

    /// Point the notifier at a different Bot API server.
    pub fn with_api_base(api_base: &str, bot_token: &str) -> Result<Self, NotifyError> {
        if bot_token.trim().is_empty() {
            return Err(NotifyError::Config("bot token is empty".into()));
        }
        let http_client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_result(&self, target: &ReplyTarget, message: &str) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: target.chat_id,
            reply_to_message_id: target.message_id,
            text: message,
            parse_mode: "Markdown",
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Transport(format!("unreadable response ({status}): {e}")))?;
        if !api.ok {
            return Err(NotifyError::Rejected(
                api.description.unwrap_or_else(|| status.to_string()),
            ));
        }
        tracing::debug!(chat_id = target.chat_id, "result delivered");
        Ok(())
    }
}
