//! Entry detection: grouping lines into logical entries.
//!
//! A two-state sequence decoder walks the lines of each `ColumnLevel2` from
//! top to bottom and labels every line as either the start of a new entry or
//! the continuation of the previous one, from three indent features:
//! the absolute left indent, the left-indent gradient against the previous
//! line, and the previous line's right indent normalized by the column
//! width. The per-transition probabilities come from two fixed, pre-trained
//! decision trees; they are opaque constants and must not be retrained or
//! simplified.

use crate::dom::{DomNode, NodeKind};
use crate::geometry::Rect;

/// Probability that the current line starts a new entry, given that the
/// previous line was a continuation (state 0).
///
/// Pre-trained decision tree; literal constants.
#[rustfmt::skip]
fn classify_from_continuation(lspace_abs: f32, grad: f32, prspace: f32) -> f32 {
    if prspace <= 0.050_192_078_575_491_905 {
        if grad <= 7.0 {
            if lspace_abs <= 5.0 {
                0.280_613_708_058_502_9
            } else {
                0.009_406_046_080_173_251
            }
        } else if prspace <= 0.023_809_523_321_688_175 {
            0.518_616_668_875_049_8
        } else {
            0.807_309_929_458_355_8
        }
    } else if lspace_abs <= 15.0 {
        0.995_615_011_795_292_3
    } else if grad <= 6.0 {
        0.287_751_801_205_705
    } else if grad <= 17.0 {
        0.889_571_264_156_600_1
    } else {
        0.570_970_094_821_298_2
    }
}

/// Probability that the current line starts a new entry, given that the
/// previous line started one (state 1).
///
/// Pre-trained decision tree; literal constants.
#[rustfmt::skip]
fn classify_from_start(lspace_abs: f32, grad: f32, prspace: f32) -> f32 {
    if grad <= 5.0 {
        if prspace <= 0.015_286_649_111_658_335 {
            if lspace_abs <= 1.0 {
                if prspace <= 0.001_201_923_121_698_200_7 {
                    0.234_487_133_244_611_26
                } else {
                    0.570_106_670_093_818_1
                }
            } else {
                0.750_939_487_052_209_6
            }
        } else if lspace_abs <= 15.0 {
            0.990_201_667_826_613_2
        } else if prspace <= 0.053_025_074_303_150_18 {
            0.355_905_006_418_485_2
        } else {
            0.972_912_055_282_621_7
        }
    } else if prspace <= 0.055_574_608_966_708_18 {
        0.008_869_073_205_841_95
    } else {
        0.856_859_272_290_703_7
    }
}

/// Decode the entry-start labels for a column of lines.
///
/// `left_margin[i]` / `right_margin[i]` are the line indents from the column
/// edges. Max-product Viterbi over the two states with equal starting mass,
/// back-tracing the recorded predecessors (1 = the line starts a new entry).
fn decode_entry_starts(left_margin: &[f32], right_margin: &[f32], column_width: f32) -> Vec<bool> {
    let n = left_margin.len();
    if n == 0 {
        return Vec::new();
    }

    let mut proba = vec![[0.0f32; 2]; n];
    let mut from = vec![[0usize; 2]; n];
    proba[0] = [0.5, 0.5];

    for i in 1..n {
        let lspace_abs = left_margin[i];
        let grad = (left_margin[i] - left_margin[i - 1]).abs();
        let prspace = right_margin[i - 1] / column_width;

        let p = [
            classify_from_continuation(lspace_abs, grad, prspace),
            classify_from_start(lspace_abs, grad, prspace),
        ];

        // Transition into "entry start"
        {
            let a = proba[i - 1][0] * p[0];
            let b = proba[i - 1][1] * p[1];
            from[i][1] = usize::from(a <= b);
            proba[i][1] = a.max(b);
        }
        // Transition into "continuation"
        {
            let a = proba[i - 1][0] * (1.0 - p[0]);
            let b = proba[i - 1][1] * (1.0 - p[1]);
            from[i][0] = usize::from(a <= b);
            proba[i][0] = a.max(b);
        }
    }

    let mut out = vec![false; n];
    let mut state = usize::from(proba[n - 1][0] <= proba[n - 1][1]);
    for i in (1..n).rev() {
        out[i] = state == 1;
        log::debug!("Prediction for line {} is {} (p={})", i, state, proba[i][state]);
        state = from[i][state];
    }
    out[0] = state == 1;
    out
}

/// Regroup the `Line` children of every `ColumnLevel2` node into `Entry`
/// nodes.
///
/// A line labeled as an entry start closes the accumulating entry and opens
/// a new one, except when the entry is still empty (the first line always
/// starts the first entry, whatever its label). Entry boxes are recomputed
/// as the union of their lines.
pub fn extract_entries(document: &mut DomNode) {
    document.walk_mut(&mut |node| {
        if node.kind == NodeKind::ColumnLevel2 {
            regroup_column(node);
        }
    });
}

fn regroup_column(column: &mut DomNode) {
    let x_min = column.bbox.x;
    let x_max = column.bbox.x1();
    log::debug!(
        "Start column x={}--{} y={} indent detection",
        x_min,
        x_max,
        column.bbox.y
    );

    let lines = std::mem::take(&mut column.children);
    if lines.is_empty() {
        return;
    }

    let left_margin: Vec<f32> = lines.iter().map(|l| (l.bbox.x - x_min) as f32).collect();
    let right_margin: Vec<f32> = lines.iter().map(|l| (x_max - l.bbox.x1()) as f32).collect();
    let starts = decode_entry_starts(&left_margin, &right_margin, column.bbox.width as f32);

    let mut entry = DomNode::new(NodeKind::Entry, Rect::default());
    for (mut line, is_start) in lines.into_iter().zip(starts) {
        line.indented = is_start;
        if is_start && entry.has_children() {
            column.add_child(entry);
            entry = DomNode::new(NodeKind::Entry, Rect::default());
        }
        entry.add_child(line);
    }
    if entry.has_children() {
        column.add_child(entry);
    }

    // Recompute the entry boxes from their lines
    for entry in &mut column.children {
        if let Some(bbox) = entry.children_bbox() {
            entry.bbox = bbox;
        }
    }
}
