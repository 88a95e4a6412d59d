// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::manual_range_contains)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # docstrata
//!
//! Document structure extraction for rasterized pages.
//!
//! Given a grayscale page image, a set of detected straight-line separators
//! and a set of raw text spans, this crate produces a hierarchical
//! description of the page:
//!
//! ```text
//! Page
//! ├── TitleLevel1 / SectionLevel1
//! │        └── ColumnLevel1
//! │                 └── TitleLevel2 / SectionLevel2
//! │                          └── ColumnLevel2
//! │                                   └── Entry
//! │                                        └── Line
//! ```
//!
//! with the recognized text attached to the lowest-level textual nodes.
//!
//! ## Pipeline
//!
//! - **Deskew**: straighten the page using the average angle of the detected
//!   vertical separators.
//! - **Block segmentation**: recursive projection-profile splitting of the
//!   page into stacked title/section regions and side-by-side columns,
//!   consulting the separator segments to force or suppress splits.
//! - **Line extraction**: directional blurring of each column, local-minimum
//!   seeding and a priority-flood watershed to carve the column into text
//!   line bands.
//! - **Entry grouping**: a two-state Viterbi decoder over per-line indent
//!   features regroups lines into logical entries.
//! - **Text assignment**: an R-tree over text-span centers attaches spans to
//!   titles, entries and lines in reading order.
//!
//! ## Quick Start
//!
//! ```ignore
//! use docstrata::{analyze_page, LayoutConfig, PageInput};
//!
//! # fn main() -> docstrata::Result<()> {
//! let input = PageInput {
//!     image: page_image,       // image::GrayImage from the rasterizer
//!     segments: separators,    // from the line-segment detector
//!     texts: text_spans,       // from OCR or the vector-text extractor
//! };
//! let analysis = analyze_page(input, &LayoutConfig::default(), None)?;
//! println!("{}", serde_json::to_string_pretty(&analysis.document).unwrap());
//! # Ok(())
//! # }
//! ```
//!
//! PDF loading, rasterization, separator detection and OCR are collaborator
//! concerns; this crate starts from their outputs.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Geometric primitives
pub mod geometry;

// Document tree
pub mod dom;

// Pixel-level filters (directional morphology, blur, reconstruction)
pub mod filters;

// Page straightening
pub mod deskew;

// Resolution handling
pub mod scale;

// Structure extraction
pub mod layout;

// Pipeline orchestration
pub mod pipeline;

pub use config::LayoutConfig;
pub use dom::{DomNode, NodeKind};
pub use error::{Error, Result};
pub use geometry::{Point, Rect, Segment};
pub use pipeline::{analyze_page, PageAnalysis, PageInput, Progress, TextFragment};

/// Label image produced by the watershed transform (0 = waterline/background,
/// positive values = line labels).
pub type LabelImage = image::ImageBuffer<image::Luma<i32>, Vec<i32>>;
