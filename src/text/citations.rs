//! Removal of citation markers left in text copied from AI chat answers

use std::sync::LazyLock;

use regex::Regex;

static CITE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[cite_start\]\s*").expect("valid regex"));

static CITE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[cite:\s*\d+\]").expect("valid regex"));

/// Strip `[cite_start]` and `[cite: N]` markers, keeping the cited text
pub fn clean_citations(text: &str) -> String {
    let without_start = CITE_START.replace_all(text, "");
    CITE_REF.replace_all(&without_start, "").into_owned()
}
