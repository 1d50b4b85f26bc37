//! Telegram legacy Markdown helpers.

/// Characters that open an entity in Telegram's legacy Markdown.
const ENTITY_CHARS: [char; 4] = ['_', '*', '`', '['];

/// Escape free text so it is shown literally inside a Markdown message.
///
/// Unescaped, a stray `_` or `*` from a nickname or an error string leaves
/// an entity unclosed and Telegram rejects the whole message.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if ENTITY_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(escape_markdown("Ace 42"), "Ace 42");
    }

    #[test]
    fn entity_characters_are_escaped() {
        assert_eq!(escape_markdown("x_*y*_[`z`]"), "x\\_\\*y\\*\\_\\[\\`z\\`]");
    }
}
