//! Configuration for the structure extraction pipeline.
//!
//! All tunables are plain numeric thresholds and sizes expressed in pixels of
//! the working resolution. The configuration is immutable and threaded
//! explicitly through every component; there is no global state.

use serde::{Deserialize, Serialize};

/// Numeric tunables for page structure extraction.
///
/// The defaults are calibrated for pages rasterized at roughly 1024 px width
/// (the pipeline's working scale after optional subsampling).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Number of pixels between two consecutive text baselines.
    pub line_height: f32,

    /// Number of blank pixels separating two words.
    pub word_spacing: f32,

    /// Approximate pixel width of an average word.
    pub word_width: f32,

    /// Number of pixels that separate two level-1 columns.
    pub column_spacing: f32,

    /// Maximal deviation (degrees) under which a segment counts as
    /// horizontal or vertical.
    pub angle_tolerance: f32,

    /// Opening extent used to smear the page horizontally when detecting the
    /// content region.
    pub page_opening_width: u32,

    /// Opening extent used to smear the page vertically when detecting the
    /// content region.
    pub page_opening_height: u32,

    /// Opening extent used to connect letters into words/blocks.
    pub block_opening_width: u32,

    /// Opening extent used to connect consecutive lines into blocks.
    pub block_opening_height: u32,

    /// Gray level above which a pixel counts as white (background).
    pub white_level: u8,

    /// Minimum height for a detected block.
    pub block_min_height: u32,

    /// Minimum width for a detected block.
    pub block_min_width: u32,

    /// Minimum black-pixel ratio for a detected block.
    pub block_filling_ratio: f32,

    /// Contrast threshold of the dynamic closing applied before the
    /// watershed flood.
    pub closing_dynamic: u8,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutConfig {
    /// Create a configuration with the production-calibrated defaults.
    pub fn new() -> Self {
        Self {
            line_height: 30.0,
            word_spacing: 10.0,
            word_width: 60.0,
            column_spacing: 40.0,
            angle_tolerance: 5.0,
            page_opening_width: 200,
            page_opening_height: 200,
            block_opening_width: 7,
            block_opening_height: 10,
            white_level: 150,
            block_min_height: 5,
            block_min_width: 150,
            block_filling_ratio: 0.5,
            closing_dynamic: 15,
        }
    }

    /// Override the baseline spacing.
    pub fn with_line_height(mut self, px: f32) -> Self {
        self.line_height = px;
        self
    }

    /// Override the level-1 column spacing.
    pub fn with_column_spacing(mut self, px: f32) -> Self {
        self.column_spacing = px;
        self
    }

    /// Override the white level.
    pub fn with_white_level(mut self, level: u8) -> Self {
        self.white_level = level;
        self
    }
}
