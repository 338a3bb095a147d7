//! Slice planning for tall cards
//!
//! A card taller than the platform's image limit is cut into contiguous
//! horizontal bands. Bands tile `[0, total_height)` exactly; every band is
//! `slice_height` tall except possibly the last, which is shorter but never empty.

use crate::error::{ExportError, ExportResult};

/// One band of the card, in rendered pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    /// 0-indexed position in the plan
    pub index: usize,
    /// Distance from the top of the card
    pub offset: u32,
    pub height: u32,
}

impl Slice {
    /// 1-indexed part number used in file names
    pub fn part(&self) -> usize {
        self.index + 1
    }

    /// First pixel row after this slice
    pub fn end(&self) -> u32 {
        self.offset + self.height
    }
}

/// Ordered, gap-free partition of a card's height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlicePlan {
    total_height: u32,
    slice_height: u32,
}

impl SlicePlan {
    /// Plan slices for a card; both dimensions must be positive
    pub fn new(total_height: u32, slice_height: u32) -> ExportResult<Self> {
        if total_height == 0 {
            return Err(ExportError::InvalidDimension {
                name: "total_height",
                value: 0.0,
            });
        }
        if slice_height == 0 {
            return Err(ExportError::InvalidDimension {
                name: "slice_height",
                value: 0.0,
            });
        }
        Ok(Self {
            total_height,
            slice_height,
        })
    }

    /// Plan slices for a measured (possibly fractional) height.
    ///
    /// Partial pixel rows are rounded up so the last row is captured.
    pub fn for_measured(total_height: f64, slice_height: u32) -> ExportResult<Self> {
        if !total_height.is_finite() || total_height <= 0.0 {
            return Err(ExportError::InvalidDimension {
                name: "total_height",
                value: total_height,
            });
        }
        Self::new(total_height.ceil().min(u32::MAX as f64) as u32, slice_height)
    }

    pub fn total_height(&self) -> u32 {
        self.total_height
    }

    pub fn slice_height(&self) -> u32 {
        self.slice_height
    }

    /// Number of slices, `ceil(total / slice)`
    pub fn len(&self) -> usize {
        slice_count(self.total_height, self.slice_height)
    }

    /// A valid plan always has at least one slice
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Slices in increasing offset order
    pub fn slices(&self) -> impl Iterator<Item = Slice> + '_ {
        (0..self.len()).map(move |index| {
            let offset = index as u32 * self.slice_height;
            Slice {
                index,
                offset,
                height: self.slice_height.min(self.total_height - offset),
            }
        })
    }
}

/// Number of slices needed to cover `total_height`; zero when either dimension is zero
pub fn slice_count(total_height: u32, slice_height: u32) -> usize {
    if slice_height == 0 {
        return 0;
    }
    total_height.div_ceil(slice_height) as usize
}

/// Whether a card this tall should be offered as a split export
pub fn needs_split(total_height: f64, threshold: u32) -> bool {
    total_height > threshold as f64
}

/// Uniform capture scale that maps the rendered width onto the output width
pub fn scale_factor(target_width: u32, rendered_width: f64) -> ExportResult<f64> {
    if target_width == 0 {
        return Err(ExportError::InvalidDimension {
            name: "target_width",
            value: 0.0,
        });
    }
    if !rendered_width.is_finite() || rendered_width <= 0.0 {
        return Err(ExportError::InvalidDimension {
            name: "rendered_width",
            value: rendered_width,
        });
    }
    Ok(target_width as f64 / rendered_width)
}
