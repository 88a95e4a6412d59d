//! Spatial assignment of text fragments to textual nodes.
//!
//! The page's text fragments (OCR boxes or vector-extracted text spans) are
//! bulk-loaded into an R-tree keyed on their centers. Every textual node then
//! queries the fragments inside its box, buckets them onto a line grid
//! anchored at the nearest structural ancestor's top edge, and concatenates
//! them in `(row, x)` reading order. The pass runs as a pre-order walk so the
//! ancestor baseline flows from the root down to the leaves; it overwrites
//! the node text, so running it twice yields identical strings.

use crate::config::LayoutConfig;
use crate::dom::{DomNode, NodeKind};
use crate::geometry::Rect;
use crate::pipeline::TextFragment;
use rstar::{RTree, RTreeObject, AABB};

/// R-tree record: a fragment indexed by its center point.
struct FragmentRecord<'a> {
    center: [i32; 2],
    top: i32,
    text: &'a str,
}

impl RTreeObject for FragmentRecord<'_> {
    type Envelope = AABB<[i32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.center)
    }
}

/// Attach the page's text fragments to its titles, entries and lines.
pub fn assign_text(document: &mut DomNode, texts: &[TextFragment], config: &LayoutConfig) {
    let records: Vec<FragmentRecord> = texts
        .iter()
        .map(|t| FragmentRecord {
            center: [t.bbox.x + t.bbox.width / 2, t.bbox.y + t.bbox.height / 2],
            top: t.bbox.y,
            text: &t.text,
        })
        .collect();
    let tree = RTree::bulk_load(records);

    let baseline = document.bbox.y;
    visit(document, baseline, &tree, config);
}

fn visit(node: &mut DomNode, baseline: i32, tree: &RTree<FragmentRecord<'_>>, config: &LayoutConfig) {
    match node.kind {
        // Titles anchor on their own box
        NodeKind::TitleLevel1 | NodeKind::TitleLevel2 => {
            fill_text(node, node.bbox.y, tree, config);
        }
        // Lines anchor on the baseline handed down by their ancestors
        NodeKind::Line => {
            fill_text(node, baseline, tree, config);
        }
        // Every other structural node passes its own top edge down
        _ => {
            let next = node.bbox.y;
            for child in &mut node.children {
                visit(child, next, tree, config);
            }
        }
    }
}

fn fill_text(node: &mut DomNode, baseline: i32, tree: &RTree<FragmentRecord<'_>>, config: &LayoutConfig) {
    let b: Rect = node.bbox;
    let envelope = AABB::from_corners([b.x, b.y], [b.x1(), b.y1()]);

    // Anchor each fragment to a discrete text row so that jittered pixel
    // coordinates still sort into reading order
    let mut matches: Vec<(i32, i32, &str)> = tree
        .locate_in_envelope(&envelope)
        .map(|f| {
            let anchor = ((f.top - baseline) as f32 / config.line_height).round() as i32;
            (anchor, f.center[0], f.text)
        })
        .collect();
    matches.sort_by_key(|&(anchor, cx, _)| (anchor, cx));

    log::debug!("New text element at y={} ({} fragments)", node.bbox.y, matches.len());
    let mut text = String::new();
    for (i, (_, _, fragment)) in matches.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(fragment);
    }
    node.text = text;
}
