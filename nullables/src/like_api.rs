//! Nullable like API: scripted responses and a call counter.

use async_trait::async_trait;
use likegate_action::{LikeApi, LikeApiError, LikeReport};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted response.
#[derive(Clone, Debug)]
enum Scripted {
    Report(LikeReport),
    Unreachable(String),
}

/// A like API that answers from a script.
///
/// Scripted responses are consumed in order; once the script is empty the
/// default response (likes added = 0) is returned.
pub struct NullLikeApi {
    script: Mutex<VecDeque<Scripted>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
    targets: Mutex<Vec<String>>,
}

impl NullLikeApi {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            targets: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response that adds `likes_added` likes.
    pub fn push_added(&self, player: &str, likes_before: u64, likes_added: u64) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Report(LikeReport {
                player_name: player.to_string(),
                likes_before,
                likes_after: likes_before + likes_added,
                likes_added,
            }));
        self
    }

    /// Queue a transport failure.
    pub fn push_error(&self, message: &str) -> &Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Unreachable(message.to_string()));
        self
    }

    /// Delay every response (to exercise timeouts).
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// How many times `send_like` was called.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Target UIDs in call order.
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

impl Default for NullLikeApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LikeApi for NullLikeApi {
    async fn send_like(&self, target_uid: &str) -> Result<LikeReport, LikeApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target_uid.to_string());

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Report(report)) => Ok(report),
            Some(Scripted::Unreachable(message)) => Err(LikeApiError::Unreachable(message)),
            None => Ok(LikeReport {
                player_name: "Unknown".into(),
                likes_before: 0,
                likes_after: 0,
                likes_added: 0,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_then_default() {
        let api = NullLikeApi::new();
        api.push_added("Ace", 10, 5).push_error("down");

        assert_eq!(api.send_like("1").await.unwrap().likes_added, 5);
        assert!(api.send_like("2").await.is_err());
        assert_eq!(api.send_like("3").await.unwrap().likes_added, 0);
        assert_eq!(api.calls(), 3);
        assert_eq!(api.targets(), vec!["1", "2", "3"]);
    }
}
