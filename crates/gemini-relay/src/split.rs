//! Reply splitting for the chat surface's message length limit.

/// Maximum characters per outbound chat message.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Split `content` into segments of at most `max_len` characters,
/// preferring to break at whitespace. A run longer than `max_len` with no
/// whitespace is split hard at the limit. Segments are trimmed; empty
/// segments are dropped.
///
/// Counts characters, not bytes, so multi-byte text never splits inside
/// a character.
pub fn split_reply(content: &str, max_len: usize) -> Vec<String> {
    assert!(max_len > 0, "max_len must be positive");

    let chars: Vec<char> = content.chars().collect();
    let mut parts = Vec::new();
    let mut start = 0;

    while chars.len() - start > max_len {
        // Backtrack from the limit to the nearest whitespace.
        let mut split_point = start + max_len;
        while split_point > start && !chars[split_point].is_whitespace() {
            split_point -= 1;
        }
        if split_point == start {
            split_point = start + max_len;
        }

        let part: String = chars[start..split_point].iter().collect();
        let part = part.trim();
        if !part.is_empty() {
            parts.push(part.to_string());
        }

        start = split_point;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }

    if start < chars.len() {
        let tail: String = chars[start..].iter().collect();
        let tail = tail.trim();
        if !tail.is_empty() {
            parts.push(tail.to_string());
        }
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_is_single_segment() {
        assert_eq!(split_reply("hello", 2000), vec!["hello"]);
    }

    #[test]
    fn test_empty_content_is_no_segments() {
        assert!(split_reply("", 2000).is_empty());
        assert!(split_reply("   ", 2000).is_empty());
    }

    #[test]
    fn test_splits_at_whitespace_before_limit() {
        let content = "aaaa bbbb cccc";
        let parts = split_reply(content, 10);
        assert_eq!(parts, vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_hard_split_without_whitespace() {
        let content = "a".repeat(25);
        let parts = split_reply(&content, 10);
        assert_eq!(parts, vec!["a".repeat(10), "a".repeat(10), "a".repeat(5)]);
    }

    #[test]
    fn test_every_segment_within_limit() {
        let content = "word ".repeat(1000);
        for part in split_reply(&content, MAX_MESSAGE_LEN) {
            assert!(part.chars().count() <= MAX_MESSAGE_LEN);
        }
    }

    #[test]
    fn test_multibyte_text_counts_characters() {
        let content = "あ".repeat(30);
        let parts = split_reply(&content, 10);
        assert_eq!(parts.len(), 3);
        for part in &parts {
            assert_eq!(part.chars().count(), 10);
        }
    }

    #[test]
    fn test_no_content_lost_when_splitting_at_spaces() {
        let content = "one two three four five six seven eight";
        let parts = split_reply(content, 12);
        let rejoined = parts.join(" ");
        assert_eq!(rejoined, content);
    }
}
