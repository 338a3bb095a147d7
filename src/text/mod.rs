//! Text module for Orca Card
//!
//! Pure text transforms applied to the card source:
//! - Spacing normalization (CJK/Latin, inline code, bold)
//! - Citation marker cleanup
//! - Plain-text detection for the format suggestion
//! - Title extraction and export file naming

pub mod citations;
pub mod detection;
pub mod spacing;
pub mod title;

pub use citations::clean_citations;
pub use detection::{has_markdown_syntax, should_show_format_button, ContentStats};
pub use spacing::{normalize, normalize_checked, preserves_content};
pub use title::{extract_title, generate_file_name, part_file_name};

use crate::config::TextConfig;

/// Prepare imported text for the editor: strips citation markers when enabled
pub fn prepare_import(text: &str, config: &TextConfig) -> String {
    if config.clean_citations {
        clean_citations(text)
    } else {
        text.to_string()
    }
}

/// Text to use when the editor loses focus.
///
/// Returns `None` when blur normalization is off or the text is already normalized.
pub fn on_blur(text: &str, config: &TextConfig) -> Option<String> {
    if !config.normalize_on_blur {
        return None;
    }
    let normalized = normalize_checked(text);
    (normalized != text).then_some(normalized)
}

/// Text handed to the renderer for export
pub fn prepare_export(text: &str, config: &TextConfig) -> String {
    let cleaned = prepare_import(text, config);
    if config.normalize_before_export {
        normalize_checked(&cleaned)
    } else {
        cleaned
    }
}
