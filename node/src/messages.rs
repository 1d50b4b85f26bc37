//! Result texts sent back to the requester (Telegram Markdown).

use likegate_action::ActionOutcome;
use likegate_policy::Eligibility;
use likegate_types::Timestamp;
use likegate_utils::{escape_markdown, format_utc};

/// Text for a request rejected by the cooldown.
pub fn deferred(eligibility: &Eligibility) -> String {
    let remaining = eligibility
        .remaining_display()
        .unwrap_or_else(|| "0h 0m".to_string());
    format!("❌ *Daily Limit Reached*\n\n⏳ Try again after: {remaining}")
}

/// Text for an executed action. Text that came back from the API is escaped.
pub fn action_result(
    outcome: &ActionOutcome,
    target_uid: &str,
    processed_at: Timestamp,
) -> String {
    match outcome {
        ActionOutcome::Success {
            player_name,
            likes_before,
            likes_after,
            likes_added,
        } => format!(
            "✅ *Request Processed Successfully*\n\n\
             👤 *Player:* {} \n\
             🆔 *UID:* `{target_uid}`\n\
             👍 *Likes Before:* {likes_before}\n\
             ✨ *Likes Added:* {likes_added}\n\
             🇮🇳 *Total Likes Now:* {likes_after}\n\
             ⏰ *Processed At:* {}",
            escape_markdown(player_name),
            format_utc(processed_at)
        ),
        ActionOutcome::NoEffect => "❌ Like failed or daily max limit reached.".to_string(),
        ActionOutcome::Error { message } => format!(
            "❌ *API Error: Unable to process like*\n\n\
             🆔 *UID:* `{target_uid}`\n\
             📛 Error: {}",
            escape_markdown(message)
        ),
    }
}
