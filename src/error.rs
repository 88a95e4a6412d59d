//! Error types for the structure extraction pipeline.

use crate::dom::NodeKind;

/// Result type alias for structure extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during page structure extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A segmentation pass was asked to split a node whose category cannot
    /// legally host that split direction. This indicates a broken layout
    /// taxonomy and aborts the whole structural pass.
    #[error("Invalid document layout: {parent:?} cannot produce {requested} children")]
    InvalidLayout {
        /// Category of the node being split
        parent: NodeKind,
        /// Kind of children the split would have produced
        requested: &'static str,
    },

    /// The page image is too small to carry any structure.
    #[error("Degenerate page: {width}x{height} input image")]
    DegeneratePage {
        /// Input image width
        width: u32,
        /// Input image height
        height: u32,
    },

    /// Processing was canceled through the [`Progress`](crate::Progress)
    /// handle. A canceled run produces no structural output.
    #[error("Processing canceled")]
    Canceled,
}
