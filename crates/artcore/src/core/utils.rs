/// Masks a secret, keeping `keep` characters at each end.
///
/// Secrets too short to mask meaningfully are replaced entirely.
///
/// # Example
///
/// ```
/// use artcore::core::utils::mask_secret;
///
/// assert_eq!(mask_secret("AKIAABCDEFGHIJKL", 4), "AKIA...IJKL");
/// assert_eq!(mask_secret("short", 4), "****");
/// ```
pub fn mask_secret(secret: &str, keep: usize) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= keep * 2 {
        return "****".to_string();
    }

    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Returns at most `max_chars` characters of `text`, never splitting a character.
///
/// # Example
///
/// ```
/// use artcore::core::utils::truncate_chars;
///
/// assert_eq!(truncate_chars("héllo world", 5), "héllo");
/// ```
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Splits a long message into chunks no longer than `limit` characters.
///
/// Splits on line boundaries when possible; a single line longer than the
/// limit is cut at the character boundary.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let mut rest = line;
        loop {
            let line_len = rest.chars().count();
            let needed = if current.is_empty() { line_len } else { line_len + 1 };

            if current_len + needed <= limit {
                if !current.is_empty() {
                    current.push('\n');
                }
                current.push_str(rest);
                current_len += needed;
                break;
            }

            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }

            // Line alone exceeds the limit
            let head = truncate_chars(rest, limit);
            chunks.push(head.to_string());
            rest = &rest[head.len()..];
            if rest.is_empty() {
                break;
            }
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret_keeps_ends() {
        assert_eq!(mask_secret("0123456789abcdef", 5), "01234...bcdef");
    }

    #[test]
    fn test_mask_secret_short_is_hidden() {
        assert_eq!(mask_secret("12345678", 4), "****");
        assert_eq!(mask_secret("", 4), "****");
    }

    #[test]
    fn test_truncate_chars_shorter_than_limit() {
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("ääää", 2), "ää");
    }

    #[test]
    fn test_split_message_short_text_single_chunk() {
        assert_eq!(split_message("hello\nworld", 2000), vec!["hello\nworld".to_string()]);
    }

    #[test]
    fn test_split_message_on_line_boundaries() {
        let chunks = split_message("aaaa\nbbbb\ncccc", 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_split_message_long_line_is_cut() {
        let chunks = split_message("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd".to_string(), "efgh".to_string(), "ij".to_string()]);
    }

    #[test]
    fn test_split_message_every_chunk_within_limit() {
        let text = (0..300).map(|i| format!("images/{i:04}.png")).collect::<Vec<_>>().join("\n");
        for chunk in split_message(&text, 2000) {
            assert!(chunk.chars().count() <= 2000);
        }
    }
}
