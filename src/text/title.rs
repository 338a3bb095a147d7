//! Title extraction and export file naming
//!
//! Exported files are named after the card's first top-level header and
//! the export date: `Title_YYMMDD.png`. Split exports append `-part-{n}`.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

/// Used when the document has no top-level header
pub const DEFAULT_TITLE: &str = "OrcaInsta";

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#[ \t]+(.+)$").expect("valid regex"));

static ILLEGAL_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("valid regex"));

/// Get the text of the first `# Title` line, trimmed
pub fn extract_title(markdown: &str) -> Option<String> {
    TITLE
        .captures(markdown)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Replace characters that are not allowed in file names with `-`
pub fn sanitize_file_stem(title: &str) -> String {
    ILLEGAL_FILENAME_CHARS.replace_all(title, "-").into_owned()
}

/// Build the file stem `Title_YYMMDD` for a given date
pub fn file_stem(markdown: &str, date: NaiveDate) -> String {
    let title = extract_title(markdown)
        .map(|t| sanitize_file_stem(&t))
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    format!("{}_{}", title, date.format("%y%m%d"))
}

/// Build `Title_YYMMDD.ext` for a given date
pub fn generate_file_name(markdown: &str, extension: &str, date: NaiveDate) -> String {
    format!("{}.{}", file_stem(markdown, date), extension)
}

/// Build `Title_YYMMDD.ext` for today's local date
pub fn generate_file_name_today(markdown: &str, extension: &str) -> String {
    generate_file_name(markdown, extension, Local::now().date_naive())
}

/// Name of the n-th (1-indexed) part of a split export
pub fn part_file_name(stem: &str, part: usize, extension: &str) -> String {
    format!("{}-part-{}.{}", stem, part, extension)
}
