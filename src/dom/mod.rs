//! The document tree model.
//!
//! The structural passes build a tree of [`DomNode`]s rooted at a single
//! [`NodeKind::Page`] node. Ownership is strictly hierarchical: nodes are
//! constructed top-down during segmentation and only ever appended to (or
//! replaced wholesale in) a parent's child sequence, never reparented.
//!
//! Invariant: once a pass has finished, every node's bounding box contains
//! the union of its children's boxes. The box is reconstructed after children
//! are mutated, not maintained incrementally.

use crate::geometry::Rect;
use serde::Serialize;

/// Category of a structural node.
///
/// The set is closed; every traversal dispatches on it with an exhaustive
/// `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    /// Page root; its box is the detected content region of the page.
    #[serde(rename = "PAGE")]
    Page,
    /// Page-level title band.
    #[serde(rename = "TITLE_LEVEL_1")]
    TitleLevel1,
    /// Column-level title band.
    #[serde(rename = "TITLE_LEVEL_2")]
    TitleLevel2,
    /// Page-level section (stack of columns).
    #[serde(rename = "SECTION_LEVEL_1")]
    SectionLevel1,
    /// Column-level section.
    #[serde(rename = "SECTION_LEVEL_2")]
    SectionLevel2,
    /// Outer column.
    #[serde(rename = "COLUMN_LEVEL_1")]
    ColumnLevel1,
    /// Innermost column; hosts entries and lines.
    #[serde(rename = "COLUMN_LEVEL_2")]
    ColumnLevel2,
    /// Logical entry: a group of consecutive lines.
    #[serde(rename = "ENTRY")]
    Entry,
    /// A single text line carved out by the watershed.
    #[serde(rename = "LINE")]
    Line,
}

impl NodeKind {
    /// True for categories that accumulate text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            NodeKind::TitleLevel1 | NodeKind::TitleLevel2 | NodeKind::Entry | NodeKind::Line
        )
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, Serialize)]
pub struct DomNode {
    /// Structural category.
    pub kind: NodeKind,
    /// Axis-aligned bounding box in working-image pixels.
    pub bbox: Rect,
    /// Owned children, in reading order.
    pub children: Vec<DomNode>,
    /// Accumulated text (textual categories only).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Source watershed label (lines only; unique within the column at
    /// extraction time).
    #[serde(skip_serializing_if = "is_zero")]
    pub label: i32,
    /// Whether the entry decoder classified this line as indented
    /// (entry-starting).
    pub indented: bool,
    /// Whether the line runs to the end of the column. Declared and carried
    /// through for display collaborators; not computed by the extraction
    /// passes.
    pub reached_eol: bool,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

impl DomNode {
    /// Create a childless node of the given category.
    pub fn new(kind: NodeKind, bbox: Rect) -> Self {
        Self {
            kind,
            bbox,
            children: Vec::new(),
            text: String::new(),
            label: 0,
            indented: false,
            reached_eol: false,
        }
    }

    /// Create the page root for a detected content region.
    pub fn page(content_box: Rect) -> Self {
        Self::new(NodeKind::Page, content_box)
    }

    /// Create a line node for a watershed label.
    pub fn line(label: i32, bbox: Rect) -> Self {
        let mut node = Self::new(NodeKind::Line, bbox);
        node.label = label;
        node
    }

    /// Append a child, taking ownership.
    pub fn add_child(&mut self, child: DomNode) {
        self.children.push(child);
    }

    /// True if the node has at least one child.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Union of the children's bounding boxes, if any.
    pub fn children_bbox(&self) -> Option<Rect> {
        let mut it = self.children.iter();
        let mut acc = it.next()?.bbox;
        for child in it {
            acc.merge(child.bbox);
        }
        Some(acc)
    }

    /// Scale every bounding box in the subtree by `s`, truncating to integer
    /// pixels.
    pub fn scale(&mut self, s: f32) {
        self.bbox.x = (self.bbox.x as f32 * s) as i32;
        self.bbox.y = (self.bbox.y as f32 * s) as i32;
        self.bbox.width = (self.bbox.width as f32 * s) as i32;
        self.bbox.height = (self.bbox.height as f32 * s) as i32;
        for child in &mut self.children {
            child.scale(s);
        }
    }

    /// Pre-order read-only walk over the subtree.
    pub fn walk<F: FnMut(&DomNode)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Pre-order mutable walk over the subtree.
    pub fn walk_mut<F: FnMut(&mut DomNode)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }

    /// Count nodes of a given category in the subtree.
    pub fn count(&self, kind: NodeKind) -> usize {
        let mut n = 0;
        self.walk(&mut |node| {
            if node.kind == kind {
                n += 1;
            }
        });
        n
    }
}
