//! Notifier that only writes to the log.

use async_trait::async_trait;
use likegate_types::ReplyTarget;

use crate::{Notifier, NotifyError};

/// Used when no bot token is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_result(&self, target: &ReplyTarget, message: &str) -> Result<(), NotifyError> {
        tracing::info!(
            chat_id = target.chat_id,
            reply_to = target.message_id,
            message,
            "result notification"
        );
        Ok(())
    }
}
