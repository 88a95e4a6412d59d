//! Structure extraction passes.
//!
//! The passes run in a fixed order over one page:
//! - [`profile`] — projection-profile signals and the run splitter
//! - [`blocks`] — recursive page → section → column segmentation
//! - [`watershed`] — the priority-flood transform shared by line extraction
//! - [`lines`] — watershed-based line carving inside each column
//! - [`entries`] — indent-based grouping of lines into entries
//! - [`text`] — spatial assignment of text fragments to textual nodes

pub mod blocks;
pub mod entries;
pub mod lines;
pub mod profile;
pub mod text;
pub mod watershed;

pub use blocks::{extract_blocks, BlockExtraction};
pub use entries::extract_entries;
pub use lines::extract_lines;
pub use text::assign_text;
