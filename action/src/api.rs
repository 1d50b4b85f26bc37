//! Outbound port for the like API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::LikeApiError;

/// What the external API reports after a like attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeReport {
    pub player_name: String,
    pub likes_before: u64,
    pub likes_after: u64,
    pub likes_added: u64,
}

/// The external like-granting service.
#[async_trait]
pub trait LikeApi: Send + Sync {
    /// Send likes to `target_uid`. Each call performs the side effect again.
    async fn send_like(&self, target_uid: &str) -> Result<LikeReport, LikeApiError>;
}
