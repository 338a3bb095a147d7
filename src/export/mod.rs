//! Export module for Orca Card
//!
//! Turns a rendered card into image files:
//! - Slice planning for cards taller than platform image limits
//! - The capture loop with scoped visual-state overrides
//! - Node filters for the external rasterizer
//! - Image sinks (directory, memory)

pub mod filter;
pub mod plan;
pub mod segmenter;
pub mod sink;

pub use filter::{ExcludeTags, NodeFilter};
pub use plan::{needs_split, scale_factor, slice_count, Slice, SlicePlan};
pub use segmenter::{
    Artifact, ExportSummary, OnSlice, Rasterizer, Segmenter, SliceRequest, StateGuard, VisualState,
};
pub use sink::{DirectorySink, ImageSink, MemorySink, RasterImage};

/// Export formats offered by the card editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One image of the whole card
    Png,
    /// Consecutive `-part-{n}` images
    SplitPng,
}

impl ExportFormat {
    /// Get the file extension for the format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png | ExportFormat::SplitPng => "png",
        }
    }

    /// Get display name for the format
    pub fn display_name(&self) -> &'static str {
        match self {
            ExportFormat::Png => "PNG",
            ExportFormat::SplitPng => "Split PNG",
        }
    }

    /// Format to use for a card of the given rendered height.
    ///
    /// `split_confirmed` is the user's answer to the split prompt.
    pub fn choose(height: f64, threshold: u32, split_confirmed: bool) -> Self {
        if needs_split(height, threshold) && split_confirmed {
            ExportFormat::SplitPng
        } else {
            ExportFormat::Png
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_format() {
        assert_eq!(ExportFormat::choose(5000.0, 10_000, true), ExportFormat::Png);
        assert_eq!(ExportFormat::choose(20_000.0, 10_000, false), ExportFormat::Png);
        assert_eq!(
            ExportFormat::choose(20_000.0, 10_000, true),
            ExportFormat::SplitPng
        );
        assert_eq!(ExportFormat::SplitPng.extension(), "png");
    }
}
