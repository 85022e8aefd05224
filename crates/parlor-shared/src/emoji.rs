//! Colon-delimited emoji shorthand expansion.
//!
//! `:smile:` becomes 🙂 when the token has a mapping; unknown tokens are
//! left as literal text. Expansion runs when text is inserted into a draft
//! (emoji-picker flow), not at send time.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Shorthand token: colon, one or more word / `+` / `-` characters, colon.
static SHORTHAND: Lazy<Regex> = Lazy::new(|| Regex::new(r":([\w+\-]+):").unwrap());

static TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("smile", "🙂"),
        ("smiley", "😃"),
        ("grinning", "😀"),
        ("grin", "😁"),
        ("joy", "😂"),
        ("wink", "😉"),
        ("blush", "😊"),
        ("heart_eyes", "😍"),
        ("sunglasses", "😎"),
        ("thinking", "🤔"),
        ("neutral_face", "😐"),
        ("cry", "😢"),
        ("sob", "😭"),
        ("angry", "😠"),
        ("scream", "😱"),
        ("heart", "❤️"),
        ("broken_heart", "💔"),
        ("+1", "👍"),
        ("thumbsup", "👍"),
        ("-1", "👎"),
        ("thumbsdown", "👎"),
        ("ok_hand", "👌"),
        ("wave", "👋"),
        ("clap", "👏"),
        ("pray", "🙏"),
        ("muscle", "💪"),
        ("eyes", "👀"),
        ("fire", "🔥"),
        ("star", "⭐"),
        ("sparkles", "✨"),
        ("tada", "🎉"),
        ("rocket", "🚀"),
        ("100", "💯"),
        ("coffee", "☕"),
        ("pizza", "🍕"),
        ("beer", "🍺"),
    ])
});

/// Look up the display symbol for a shorthand token (without colons).
pub fn lookup(token: &str) -> Option<&'static str> {
    TABLE.get(token).copied()
}

/// Replace every mapped `:token:` in `text` with its symbol. Unmatched
/// tokens pass through unchanged.
pub fn expand(text: &str) -> String {
    SHORTHAND
        .replace_all(text, |caps: &regex::Captures<'_>| match lookup(&caps[1]) {
            Some(symbol) => symbol.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_token_expands() {
        assert_eq!(expand(" :smile: "), " 🙂 ");
    }

    #[test]
    fn test_unknown_token_is_literal() {
        assert_eq!(expand(" :not_a_real_emoji: "), " :not_a_real_emoji: ");
    }

    #[test]
    fn test_mixed_text() {
        assert_eq!(expand("ship it :rocket::+1:"), "ship it 🚀👍");
    }

    #[test]
    fn test_plain_colons_untouched() {
        assert_eq!(expand("10:30: meeting"), "10:30: meeting");
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("tada"), Some("🎉"));
        assert_eq!(lookup("nope"), None);
    }
}
