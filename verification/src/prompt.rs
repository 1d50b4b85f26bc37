//! User-facing challenge prompt (Telegram Markdown).

use std::time::Duration;

use likegate_utils::escape_markdown;

/// Fields shown in the prompt.
pub struct PromptFields<'a> {
    pub display_name: &'a str,
    pub target_uid: &'a str,
    pub region: &'a str,
    pub link: &'a str,
    pub ttl: Duration,
    pub vip_access_url: Option<&'a str>,
}

/// Render the "verification required" message.
pub fn render(fields: &PromptFields<'_>) -> String {
    let mut msg = format!(
        "🔒 *Verification Required*\n\n\
         🤵 *Hello:* {}\n\
         🆔 *Uid:* `{}`\n\
         🌍 *Region:* {}\n\n\
         Verify to get 1 more request. This is free\n\
         {}\n\
         ⚠️ Link expires in {}",
        escape_markdown(fields.display_name),
        fields.target_uid,
        fields.region.to_uppercase(),
        fields.link,
        describe_ttl(fields.ttl),
    );
    if let Some(url) = fields.vip_access_url {
        msg.push_str(&format!("\n*Purchase Vip&No Verify* {url}"));
    }
    msg
}

/// "10 minutes", "2 hours", "1 hour 30 minutes", "45 seconds".
pub fn describe_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    if secs < 60 {
        return plural(secs, "second");
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    match (hours, minutes) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "minute")),
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
