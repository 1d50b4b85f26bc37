//! Bounded invocation of the like API.

use std::sync::Arc;
use std::time::Duration;

use crate::{LikeApi, LikeApiError};

/// Upper bound on a single external call.
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Normalized result of one external call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionOutcome {
    /// At least one like was added.
    Success {
        player_name: String,
        likes_before: u64,
        likes_after: u64,
        likes_added: u64,
    },
    /// The API answered but added nothing (daily maximum reached, or similar).
    NoEffect,
    /// Timeout, transport failure or an unreadable response.
    Error { message: String },
}

/// Calls a [`LikeApi`] under a timeout and folds everything into an
/// [`ActionOutcome`]. Never retries.
pub struct ActionInvoker {
    api: Arc<dyn LikeApi>,
    timeout: Duration,
}

impl ActionInvoker {
    pub fn new(api: Arc<dyn LikeApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Perform the action for `target_uid` exactly once.
    pub async fn invoke(&self, target_uid: &str) -> ActionOutcome {
        let result = match tokio::time::timeout(self.timeout, self.api.send_like(target_uid)).await
        {
            Ok(result) => result,
            Err(_) => Err(LikeApiError::Timeout(format!(
                "no response within {:?}",
                self.timeout
            ))),
        };

        match result {
            Ok(report) if report.likes_added == 0 => {
                tracing::debug!(target_uid, "like API added no likes");
                ActionOutcome::NoEffect
            }
            Ok(report) => ActionOutcome::Success {
                player_name: report.player_name,
                likes_before: report.likes_before,
                likes_after: report.likes_after,
                likes_added: report.likes_added,
            },
            Err(e) => {
                tracing::warn!(target_uid, error = %e, "like API call failed");
                ActionOutcome::Error {
                    message: e.to_string(),
                }
            }
        }
    }
}
