use crate::text::collapse_whitespace;

const SHORT_LIMIT: usize = 20;
const CLAUSE_MIN: usize = 10;
const CLAUSE_MAX: usize = 80;

/// Short row label for a message.
///
/// Content of at most 20 characters is shown as-is. Longer content is cut at
/// the first sentence terminator that follows a 10 to 80 character clause,
/// otherwise after 20 characters. Either cut gets a `...` suffix.
pub fn create_summary(content: &str) -> String {
    let trimmed = collapse_whitespace(content);
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= SHORT_LIMIT {
        return trimmed;
    }

    let clause_end = chars
        .iter()
        .enumerate()
        .skip(CLAUSE_MIN)
        .take(CLAUSE_MAX - CLAUSE_MIN + 1)
        .find(|(_, ch)| matches!(ch, '.' | '!' | '?'))
        .map(|(idx, _)| idx);

    let cut = clause_end.unwrap_or(SHORT_LIMIT);
    let mut summary: String = chars[..cut].iter().collect();
    summary.push_str("...");
    summary
}

#[cfg(test)]
mod tests {
    use super::create_summary;

    #[test]
    fn short_content_is_verbatim() {
        assert_eq!(create_summary("  Hello   world "), "Hello world");
        assert_eq!(create_summary("exactly twenty chars"), "exactly twenty chars");
    }

    #[test]
    fn clause_is_cut_before_terminator() {
        assert_eq!(create_summary("This is a short test."), "This is a short test...");
        assert_eq!(
            create_summary("Why does this fail? Because the cache was stale."),
            "Why does this fail..."
        );
    }

    #[test]
    fn terminator_before_window_is_ignored() {
        assert_eq!(
            create_summary("Hello. This continues for a while without another stop"),
            "Hello. This continue..."
        );
    }

    #[test]
    fn terminator_after_window_falls_back_to_prefix() {
        let content = format!("{}.", "a".repeat(90));
        assert_eq!(create_summary(&content), format!("{}...", "a".repeat(20)));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let content = "这是一个很长的中文句子用于测试摘要功能是否正确。后面还有更多内容";
        // Full-width stops are not terminators, so this takes the 20 character prefix.
        assert_eq!(create_summary(content), "这是一个很长的中文句子用于测试摘要功能是...");
    }
}
