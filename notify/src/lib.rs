//! Delivery of dispatcher results back to the requester.
//!
//! Notifications are best-effort: callers log a [`NotifyError`] and move on.

pub mod error;
pub mod log;
pub mod telegram;

use async_trait::async_trait;
use likegate_types::ReplyTarget;

pub use error::NotifyError;
pub use log::LogNotifier;
pub use telegram::{TelegramNotifier, DEFAULT_TELEGRAM_API};

/// Outbound port for result messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` (Markdown) as a reply to `target`.
    async fn send_result(&self, target: &ReplyTarget, message: &str) -> Result<(), NotifyError>;
}
