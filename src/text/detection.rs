//! Detection of plain text that would benefit from markdown formatting
//!
//! Drives the "format" suggestion shown after a paste: long, unformatted
//! text gets the button, text that already carries markdown does not.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Minimum length (in characters) before formatting is suggested
pub const MIN_FORMAT_LENGTH: usize = 50;

/// Single-line text must be at least this long to be suggested
pub const MIN_SINGLE_LINE_LENGTH: usize = 100;

static MARKDOWN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?m)^#{1,6}\s",         // headers
        r"\*\*.*?\*\*",           // bold
        r"\*.*?\*",               // italic
        r"_.*?_",                 // italic
        r"`{1,3}.*?`{1,3}",       // inline code
        r"\[.*?\]\(.*?\)",        // links
        r"(?m)^\s*[-*+]\s",       // unordered lists
        r"(?m)^\s*\d+\.\s",       // ordered lists
        r"(?m)^>\s",              // blockquotes
        r"\|.*\|.*\|",            // tables
        r"(?ms)^```.*?^```",      // fenced code
        r"~~.*?~~",               // strikethrough
        r"\[\^[^\]]*\]",          // footnotes
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static CONVERSATIONAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"我|你|请|谢谢|好的|是的|不是|为什么|怎么|如何",
        r"问|答|解释|总结|请教|请问",
        r"(?i)\b(?:I asked|you said|please|answer|explain|summarize)\b",
        r"(?i)\b(?:how to|what is|can you|tell me|why)\b",
        r"[？?]",
        r"\b(?:function|class|const|let|var|import|export)\b",
        r"(?s)```.*?```",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Check if text contains any markdown syntax
pub fn has_markdown_syntax(text: &str) -> bool {
    MARKDOWN_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Check if text reads like a chat transcript, Q&A or code discussion
pub fn has_conversational_patterns(text: &str) -> bool {
    CONVERSATIONAL_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Check if the format button should be offered for this text
pub fn should_show_format_button(text: &str) -> bool {
    let length = text.chars().count();
    if length <= MIN_FORMAT_LENGTH {
        return false;
    }

    if has_markdown_syntax(text) {
        return false;
    }

    let non_empty_lines = text.lines().filter(|l| !l.trim().is_empty()).count();
    !(non_empty_lines < 2 && length < MIN_SINGLE_LINE_LENGTH)
}

/// Check if content is likely already formatted
pub fn is_already_formatted(text: &str) -> bool {
    has_markdown_syntax(text)
}

/// Summary of a document, shown in the status area and in debug logs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentStats {
    pub length: usize,
    pub lines: usize,
    pub words: usize,
    pub has_markdown: bool,
    pub should_show_button: bool,
    pub has_conversational_patterns: bool,
}

impl ContentStats {
    pub fn of(text: &str) -> Self {
        Self {
            length: text.chars().count(),
            lines: text.split('\n').count(),
            words: word_count(text),
            has_markdown: has_markdown_syntax(text),
            should_show_button: should_show_format_button(text),
            has_conversational_patterns: has_conversational_patterns(text),
        }
    }
}

/// Count words; each CJK ideograph counts as one word
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .map(|token| {
            let cjk = token.chars().filter(|&c| super::spacing::is_cjk(c)).count();
            let has_other = token.chars().any(|c| !super::spacing::is_cjk(c));
            cjk + usize::from(has_other)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = "This is a plain paragraph copied from somewhere.\nIt has two lines and no markup at all in it.";

    #[test]
    fn test_detects_markdown() {
        assert!(has_markdown_syntax("# Title"));
        assert!(has_markdown_syntax("some **bold** text"));
        assert!(has_markdown_syntax("- item"));
        assert!(has_markdown_syntax("1. first"));
        assert!(has_markdown_syntax("> quote"));
        assert!(has_markdown_syntax("[link](https://example.com)"));
        assert!(!has_markdown_syntax("just words here"));
    }

    #[test]
    fn test_format_button_for_plain_text() {
        assert!(should_show_format_button(PLAIN));
    }

    #[test]
    fn test_no_button_for_short_text() {
        assert!(!should_show_format_button("too short"));
    }

    #[test]
    fn test_no_button_for_markdown() {
        let text = format!("# Heading\n{}", PLAIN);
        assert!(!should_show_format_button(&text));
        assert!(is_already_formatted(&text));
    }

    #[test]
    fn test_single_line_needs_length() {
        let medium = "a".repeat(60);
        assert!(!should_show_format_button(&medium));
        let long = "a".repeat(120);
        assert!(should_show_format_button(&long));
    }

    #[test]
    fn test_conversational_patterns() {
        assert!(has_conversational_patterns("请问这个怎么用"));
        assert!(has_conversational_patterns("Can you explain this"));
        assert!(!has_conversational_patterns("Rust compiles quickly"));
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("hello world"), 2);
        assert_eq!(word_count("  "), 0);
        assert_eq!(word_count("你好 world"), 3);
    }

    #[test]
    fn test_content_stats() {
        let stats = ContentStats::of(PLAIN);
        assert_eq!(stats.lines, 2);
        assert!(!stats.has_markdown);
        assert!(stats.should_show_button);
    }
}
