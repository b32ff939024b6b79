use std::sync::LazyLock;

use regex::Regex;

// Tried in order; the first match wins.
static STATUS_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"https?://(?:twitter\.com|x\.com)/\w+/status/(\d+)").unwrap(),
        Regex::new(r"https?://(?:twitter\.com|x\.com)/i/status/(\d+)").unwrap(),
    ]
});

/// Pull the post id out of a status URL on twitter.com or x.com.
///
/// Accepts both `/<user>/status/<id>` and `/i/status/<id>`; anything else yields `None`.
pub fn extract_post_id(url: &str) -> Option<String> {
    STATUS_PATTERNS
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// A post id is a non-empty run of ASCII digits.
pub fn is_post_id(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
