//! Spacing normalization for mixed CJK/Latin markdown
//!
//! Rewrites raw markdown so that cards read with an even rhythm:
//! - Space around inline code spans
//! - Space around `**bold**` delimiters where the renderer or the eye needs it
//! - Space between CJK ideographs and Latin letters or digits
//!
//! Only whitespace is ever inserted. Every other character keeps its
//! position relative to the others.

use std::sync::LazyLock;

use regex::Regex;

/// Two-character bold delimiter
const EMPHASIS: &str = "**";

static LATIN_THEN_CJK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z0-9])([\x{4e00}-\x{9fa5}])").expect("valid regex"));

static CJK_THEN_LATIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\x{4e00}-\x{9fa5}])([A-Za-z0-9])").expect("valid regex"));

/// Normalize spacing in a markdown document.
///
/// Stages run in a fixed order, each on the previous output:
/// inline code, emphasis, then CJK/Latin adjacency.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let spaced = space_inline_code(text);
    let spaced = space_emphasis(&spaced);
    space_cjk_latin(&spaced)
}

/// Normalize, falling back to the input if the result would lose content.
///
/// Used by formatting paths whose output is not produced by [`normalize`]
/// alone (for example text returned by an external formatter).
pub fn normalize_checked(text: &str) -> String {
    let formatted = normalize(text);
    if preserves_content(text, &formatted) {
        formatted
    } else {
        log::warn!("Spacing normalization changed content; keeping original text");
        text.to_string()
    }
}

/// True when `after` holds exactly the non-whitespace characters of `before`, in order.
pub fn preserves_content(before: &str, after: &str) -> bool {
    before
        .chars()
        .filter(|c| !c.is_whitespace())
        .eq(after.chars().filter(|c| !c.is_whitespace()))
}

/// CJK Unified Ideographs, U+4E00..=U+9FA5
pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// ASCII letter or digit
pub fn is_latin_alnum(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

/// ASCII punctuation plus the CJK and general punctuation blocks
pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(c,
            '\u{2010}'..='\u{2027}'
            | '\u{2030}'..='\u{205e}'
            | '\u{3000}'..='\u{303f}'
            | '\u{ff01}'..='\u{ff0f}'
            | '\u{ff1a}'..='\u{ff20}'
            | '\u{ff3b}'..='\u{ff40}'
            | '\u{ff5b}'..='\u{ff65}'
        )
}

/// Markers that bind directly to the code span they wrap (`**`x`**`, `_`x`_`)
fn is_inline_marker(c: char) -> bool {
    matches!(c, '*' | '_' | '~')
}

/// Stage 1: pad inline code spans on the outside.
///
/// A run of N backticks is one delimiter; the next run of the same length
/// closes it. Runs of other lengths inside an open span are literal, and a
/// run that is never closed is left alone.
fn space_inline_code(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut before = vec![false; chars.len()];
    let mut after = vec![false; chars.len()];

    let mut open: Option<(usize, usize)> = None;
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '`' {
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == '`' {
            i += 1;
        }
        let len = i - start;

        match open {
            None => open = Some((start, len)),
            Some((open_start, open_len)) if open_len == len => {
                before[open_start] = true;
                after[i - 1] = true;
                open = None;
            }
            Some(_) => {}
        }
    }

    let needs_gap = |c: char| !c.is_whitespace() && c != '`' && !is_inline_marker(c);

    let mut out = String::with_capacity(text.len() + 8);
    for (idx, &c) in chars.iter().enumerate() {
        if before[idx] && idx > 0 && needs_gap(chars[idx - 1]) {
            out.push(' ');
        }
        out.push(c);
        if after[idx] && idx + 1 < chars.len() && needs_gap(chars[idx + 1]) {
            out.push(' ');
        }
    }
    out
}

/// Stage 2: pad `**` delimiters on the outside when the boundary needs it.
///
/// Delimiter `k` (0-indexed) opens a span when `k` is even and closes one
/// when odd. An opener with no closer after it is not a span. Extra `*`
/// next to a delimiter (`***bold italic***`) count as part of it.
fn space_emphasis(text: &str) -> String {
    let segments: Vec<&str> = text.split(EMPHASIS).collect();
    if segments.len() < 3 {
        return text.to_string();
    }

    let last = segments.len() - 1;
    let mut out: Vec<String> = segments.iter().map(|s| s.to_string()).collect();

    // delimiter k sits between segments k and k + 1
    for k in 0..last {
        if k % 2 == 0 {
            if k + 1 >= last {
                break;
            }
            let outside = last_unstarred(segments[k]);
            let inside = first_unstarred(segments[k + 1]);
            if let (Some(outside), Some(inside)) = (outside, inside) {
                if boundary_needs_space(outside, inside) {
                    let at = out[k].trim_end_matches('*').len();
                    out[k].insert(at, ' ');
                }
            }
        } else {
            let inside = last_unstarred(segments[k]);
            let outside = first_unstarred(segments[k + 1]);
            if let (Some(outside), Some(inside)) = (outside, inside) {
                if boundary_needs_space(outside, inside) {
                    let at = out[k + 1].len() - out[k + 1].trim_start_matches('*').len();
                    out[k + 1].insert(at, ' ');
                }
            }
        }
    }

    out.join(EMPHASIS)
}

fn first_unstarred(segment: &str) -> Option<char> {
    segment.trim_start_matches('*').chars().next()
}

fn last_unstarred(segment: &str) -> Option<char> {
    segment.trim_end_matches('*').chars().next_back()
}

/// Whether a delimiter between `outside` and `inside` should be padded.
///
/// Padding applies to CJK/Latin pairs, and to punctuation just inside the
/// span, which markdown renderers refuse to treat as a delimiter boundary
/// unless the outside is whitespace or punctuation.
fn boundary_needs_space(outside: char, inside: char) -> bool {
    if outside.is_whitespace() {
        return false;
    }
    if (is_cjk(outside) && is_latin_alnum(inside)) || (is_latin_alnum(outside) && is_cjk(inside))
    {
        return true;
    }
    is_punctuation(inside) && !is_punctuation(outside)
}

/// Stage 3: space between CJK ideographs and Latin letters or digits
fn space_cjk_latin(text: &str) -> String {
    let spaced = LATIN_THEN_CJK.replace_all(text, "${1} ${2}");
    CJK_THEN_LATIN.replace_all(&spaced, "${1} ${2}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_cjk_latin_boundary() {
        assert_eq!(normalize("Hello世界"), "Hello 世界");
        assert_eq!(normalize("世界Hello"), "世界 Hello");
        assert_eq!(normalize("版本2发布"), "版本 2 发布");
    }

    #[test]
    fn test_backtick_spacing() {
        assert_eq!(normalize("text`code`more"), "text `code` more");
        assert_eq!(normalize("text `code` more"), "text `code` more");
    }

    #[test]
    fn test_backtick_fence_not_split() {
        let fenced = "intro\n```rust\nlet x = 1;\n```\nouter";
        assert_eq!(normalize(fenced), fenced);
        assert_eq!(normalize("a``b`c``d"), "a ``b`c`` d");
    }

    #[test]
    fn test_unclosed_backtick_left_alone() {
        assert_eq!(normalize("price`5"), "price`5");
    }

    #[test]
    fn test_code_inside_bold_keeps_delimiters_attached() {
        assert_eq!(normalize("**`code`**"), "**`code`**");
    }

    #[test]
    fn test_emphasis_latin_only_untouched() {
        assert_eq!(normalize("A**B**C"), "A**B**C");
    }

    #[test]
    fn test_emphasis_closing_boundary() {
        assert_eq!(normalize("中**文**abc"), "中**文** abc");
    }

    #[test]
    fn test_emphasis_opening_boundary() {
        assert_eq!(normalize("abc**文**"), "abc **文**");
    }

    #[test]
    fn test_bold_italic_treated_like_bold() {
        assert_eq!(normalize("a***b***c"), "a***b***c");
        assert_eq!(normalize("中***文***abc"), "中***文*** abc");
        assert_eq!(normalize("abc***文***"), "abc ***文***");
        assert_eq!(normalize("中***文*** abc"), "中***文*** abc");
    }

    #[test]
    fn test_emphasis_punctuation_inside_closer() {
        assert_eq!(normalize("**比如：**后面"), "**比如：** 后面");
        assert_eq!(normalize("见**“引用”**"), "见 **“引用”**");
    }

    #[test]
    fn test_unbalanced_emphasis_degrades() {
        assert_eq!(normalize("中**文"), "中**文");
        assert_eq!(normalize("中**文**abc**def"), "中**文** abc**def");
    }

    #[test]
    fn test_headline_mix() {
        let input = "# 使用Rust构建CLI\n\n支持**加粗**和`code`两种写法";
        let expected = "# 使用 Rust 构建 CLI\n\n支持**加粗**和 `code` 两种写法";
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn test_preserves_content() {
        assert!(preserves_content("a b\nc", "abc"));
        assert!(!preserves_content("abc", "ab"));
        assert!(!preserves_content("abc", "acb"));
    }

    #[test]
    fn test_normalize_checked_matches_normalize() {
        let input = "中**文**abc 和`x`";
        assert_eq!(normalize_checked(input), normalize(input));
    }

    fn card_text() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                Just('a'),
                Just('Z'),
                Just('7'),
                Just('中'),
                Just('文'),
                Just('*'),
                Just('`'),
                Just(' '),
                Just('\n'),
                Just('：'),
                Just('。'),
                Just('_'),
                Just('('),
            ],
            0..48,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_normalize_preserves_content(s in card_text()) {
            let out = normalize(&s);
            prop_assert!(preserves_content(&s, &out));
            prop_assert!(out.chars().count() >= s.chars().count());
        }

        #[test]
        fn prop_normalize_is_idempotent(s in card_text()) {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_arbitrary_unicode_preserved(s in "\\PC*") {
            prop_assert!(preserves_content(&s, &normalize(&s)));
        }
    }
}
