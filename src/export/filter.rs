//! Capture exclusion predicates
//!
//! The rasterizer walks the rendered card and asks a [`NodeFilter`] whether
//! each node belongs in the image. The core only sees node kinds as strings.

/// Decides whether a node of the given kind is captured
pub trait NodeFilter {
    fn should_include(&self, node_kind: &str) -> bool;
}

impl<F> NodeFilter for F
where
    F: Fn(&str) -> bool,
{
    fn should_include(&self, node_kind: &str) -> bool {
        self(node_kind)
    }
}

/// Excludes a fixed set of element tags, compared case-insensitively
#[derive(Debug, Clone)]
pub struct ExcludeTags {
    tags: Vec<String>,
}

impl ExcludeTags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ExcludeTags {
    /// Embedded frames and scripts never render into the card
    fn default() -> Self {
        Self::new(["IFRAME", "SCRIPT"])
    }
}

impl NodeFilter for ExcludeTags {
    fn should_include(&self, node_kind: &str) -> bool {
        !self.tags.iter().any(|t| t.eq_ignore_ascii_case(node_kind))
    }
}
