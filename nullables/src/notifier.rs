//! Nullable notifier: records every message instead of sending it.

use async_trait::async_trait;
use likegate_notify::{Notifier, NotifyError};
use likegate_types::ReplyTarget;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub target: ReplyTarget,
    pub text: String,
}

pub struct NullNotifier {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl NullNotifier {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every send fail. Failed sends are not recorded.
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for NullNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for NullNotifier {
    async fn send_result(&self, target: &ReplyTarget, message: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport("injected send failure".into()));
        }
        self.sent.lock().unwrap().push(SentMessage {
            target: *target,
            text: message.to_string(),
        });
        Ok(())
    }
}
