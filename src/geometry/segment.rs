//! Straight-line separator segments.
//!
//! Segments are produced once per page by the external separator detector,
//! scaled together with the image when the resolution changes, and treated as
//! immutable during segmentation (only filtered into per-region subsets).

use super::Point;
use serde::{Deserialize, Serialize};

/// A detected straight-line separator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint; by convention `start.y <= end.y`.
    pub start: Point,
    /// Second endpoint.
    pub end: Point,
    /// Stroke width in pixels.
    pub width: f64,
    /// Detection confidence (number of false alarms).
    pub nfa: f64,
    /// Length in pixels.
    pub length: f64,
    /// Angle in degrees, normalized to `[0, 180)`.
    pub angle: f64,
}

impl Segment {
    /// True if the segment is horizontal within `tolerance` degrees.
    ///
    /// The angle is folded about 90° so that both near-0° and near-180°
    /// segments count as horizontal.
    pub fn is_horizontal(&self, tolerance: f32) -> bool {
        let a = if self.angle <= 90.0 {
            self.angle
        } else {
            180.0 - self.angle
        };
        a < f64::from(tolerance)
    }

    /// True if the segment is vertical within `tolerance` degrees.
    pub fn is_vertical(&self, tolerance: f32) -> bool {
        (self.angle - 90.0).abs() < f64::from(tolerance)
    }

    /// Scale both endpoints and the length by `s`.
    pub fn scale(&mut self, s: f32) {
        self.start.x = (self.start.x as f32 * s) as i32;
        self.start.y = (self.start.y as f32 * s) as i32;
        self.end.x = (self.end.x as f32 * s) as i32;
        self.end.y = (self.end.y as f32 * s) as i32;
        self.length *= f64::from(s);
    }
}
