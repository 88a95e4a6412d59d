//! Projection-profile analysis.
//!
//! 1-D signals derived from a region of the page image (axis sums,
//! "fraction of dark pixels below a threshold" profiles) and the generic
//! splitter that partitions such a signal into content runs separated by
//! low-density gaps. This is the core segmentation primitive; it is applied
//! once per axis by the block segmenter.

use crate::geometry::Rect;
use image::GrayImage;

/// Sentinel marking a sample as a forced separator in binarized profiles.
pub const FORCED: u8 = u8::MAX;

/// Sentinel marking a sample as a forced separator in scored profiles.
pub const FORCED_SCORE: i32 = i32::MAX;

/// Partition a binarized profile into content runs.
///
/// A sample is content when it is zero and a gap when it is nonzero. A gap
/// run separates two content runs only if it is at least `min_separator`
/// long, or it is the trailing run, or it contains the [`FORCED`] sentinel.
/// Leading and trailing gap runs never become content.
///
/// Returns the half-open `[start, end)` index ranges of the content runs in
/// ascending order.
///
/// ```
/// use docstrata::layout::profile::split_sections;
///
/// let profile = [1u8, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 1];
/// assert_eq!(split_sections(&profile, 3), vec![(1, 8), (11, 13)]);
/// ```
pub fn split_sections(profile: &[u8], min_separator: usize) -> Vec<(usize, usize)> {
    split_runs(profile, min_separator, |v| *v != 0, |v| *v == FORCED)
}

/// Partition an integer-scored profile into content runs.
///
/// A sample is content when its score is strictly below `threshold`. The gap
/// rules match [`split_sections`], with [`FORCED_SCORE`] as the forced
/// sentinel.
pub fn split_scored_sections(
    scores: &[i32],
    threshold: i32,
    min_separator: usize,
) -> Vec<(usize, usize)> {
    split_runs(
        scores,
        min_separator,
        |v| *v >= threshold,
        |v| *v == FORCED_SCORE,
    )
}

fn split_runs<T>(
    data: &[T],
    min_separator: usize,
    is_gap: impl Fn(&T) -> bool,
    is_forced: impl Fn(&T) -> bool,
) -> Vec<(usize, usize)> {
    let n = data.len();
    let mut sections = Vec::new();

    let mut i = 0;
    // Discard the leading gap run
    while i < n && is_gap(&data[i]) {
        i += 1;
    }

    let mut left = i;
    while i < n {
        // Advance to the end of the content run
        while i < n && !is_gap(&data[i]) {
            i += 1;
        }

        let right = i;
        // Advance to the end of the gap run
        let mut forced = false;
        while i < n && is_gap(&data[i]) {
            forced |= is_forced(&data[i]);
            i += 1;
        }

        let gap = i - right;
        if i == n || gap >= min_separator || forced {
            sections.push((left, right));
            left = i;
        }
    }
    sections
}

/// Index of the first score strictly below `threshold`.
///
/// Returns `values.len()` when every sample passes the threshold. Used for
/// indent measurement.
pub fn leading_space_scored(values: &[i32], threshold: i32) -> usize {
    values
        .iter()
        .position(|&v| v < threshold)
        .unwrap_or(values.len())
}

/// Index of the first nonzero sample of a binarized profile.
pub fn leading_space(values: &[u8]) -> usize {
    values.iter().position(|&v| v != 0).unwrap_or(values.len())
}

/// Sum of the gray values of each row of `region`.
pub fn sum_rows(img: &GrayImage, region: Rect) -> Vec<i64> {
    let mut sums = vec![0i64; region.height.max(0) as usize];
    for (i, y) in (region.y..region.y1()).enumerate() {
        let mut acc = 0i64;
        for x in region.x..region.x1() {
            acc += i64::from(img.get_pixel(x as u32, y as u32).0[0]);
        }
        sums[i] = acc;
    }
    sums
}

/// Sum of the gray values of each column of `region`.
pub fn sum_columns(img: &GrayImage, region: Rect) -> Vec<i64> {
    let mut sums = vec![0i64; region.width.max(0) as usize];
    for y in region.y..region.y1() {
        for (i, x) in (region.x..region.x1()).enumerate() {
            sums[i] += i64::from(img.get_pixel(x as u32, y as u32).0[0]);
        }
    }
    sums
}

/// Per-row blankness profile of `region`.
///
/// A row scores 1 when strictly fewer than `fraction × width` of its pixels
/// are darker than `white_level`, 0 otherwise.
pub fn blank_rows(img: &GrayImage, region: Rect, white_level: u8, fraction: f32) -> Vec<u8> {
    let mut out = vec![0u8; region.height.max(0) as usize];
    blank_rows_into(img, region, white_level, fraction, &mut out);
    out
}

/// [`blank_rows`] writing into a caller-provided buffer of length
/// `region.height`.
pub fn blank_rows_into(
    img: &GrayImage,
    region: Rect,
    white_level: u8,
    fraction: f32,
    out: &mut [u8],
) {
    let limit = fraction * region.width as f32;
    for (i, y) in (region.y..region.y1()).enumerate() {
        let mut dark = 0i32;
        for x in region.x..region.x1() {
            dark += i32::from(img.get_pixel(x as u32, y as u32).0[0] < white_level);
        }
        out[i] = u8::from((dark as f32) < limit);
    }
}

/// Per-column blankness profile of `region`.
///
/// A column scores 1 when strictly fewer than `fraction × height` of its
/// pixels are darker than `white_level`, 0 otherwise.
pub fn blank_columns(img: &GrayImage, region: Rect, white_level: u8, fraction: f32) -> Vec<u8> {
    let limit = fraction * region.height as f32;
    let mut dark = vec![0i32; region.width.max(0) as usize];
    for y in region.y..region.y1() {
        for (i, x) in (region.x..region.x1()).enumerate() {
            dark[i] += i32::from(img.get_pixel(x as u32, y as u32).0[0] < white_level);
        }
    }
    dark.iter().map(|&d| u8::from((d as f32) < limit)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_sections_worked_example() {
        let profile = [1u8, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 1];
        assert_eq!(split_sections(&profile, 3), vec![(1, 8), (11, 13)]);
    }

    #[test]
    fn test_split_scored_sections_worked_example() {
        let scores = [1, 0, 0, 0, 1, 1, 0, 0, 1, 1, 1, 0, 0, 1];
        assert_eq!(split_scored_sections(&scores, 1, 3), vec![(1, 8), (11, 13)]);
    }

    #[test]
    fn test_split_sections_forced_short_gap() {
        // The 2-long gap at [4, 6) is below min_separator but contains the
        // forced sentinel, so it must still break
        let profile = [0u8, 0, 0, 0, FORCED, 1, 0, 0];
        assert_eq!(split_sections(&profile, 5), vec![(0, 4), (6, 8)]);

        let scores = [0, 0, 0, FORCED_SCORE, 0, 0];
        assert_eq!(split_scored_sections(&scores, 1, 10), vec![(0, 3), (4, 6)]);
    }

    #[test]
    fn test_split_sections_degenerate_inputs() {
        assert!(split_sections(&[], 3).is_empty());
        assert!(split_sections(&[1, 1, 1, 1], 1).is_empty());
        // All-content input yields one range spanning the whole input
        assert_eq!(split_sections(&[0, 0, 0], 2), vec![(0, 3)]);
    }

    #[test]
    fn test_split_sections_trailing_gap_discarded() {
        // Trailing gap closes the last section but produces no section of
        // its own
        assert_eq!(split_sections(&[0, 0, 1, 1], 10), vec![(0, 2)]);
        // Leading gap likewise
        assert_eq!(split_sections(&[1, 1, 0, 0], 10), vec![(2, 4)]);
    }

    #[test]
    fn test_split_sections_short_gap_is_bridged() {
        // Gap of 1 < min_separator merges the two content runs into one
        // section spanning up to the *next* accepted separator
        assert_eq!(split_sections(&[0, 0, 1, 0, 0], 2), vec![(0, 5)]);
    }

    #[test]
    fn test_leading_space() {
        assert_eq!(leading_space_scored(&[9, 9, 2, 9], 5), 2);
        assert_eq!(leading_space_scored(&[9, 9], 5), 2);
        assert_eq!(leading_space(&[0, 0, 7, 0]), 2);
        assert_eq!(leading_space(&[0, 0]), 2);
    }

    #[test]
    fn test_blank_profiles() {
        // 4x4 image: dark square in the top-left 2x2
        let mut img = GrayImage::from_pixel(4, 4, image::Luma([255]));
        for y in 0..2 {
            for x in 0..2 {
                img.put_pixel(x, y, image::Luma([0]));
            }
        }
        let region = Rect::new(0, 0, 4, 4);
        // Rows 0-1 have half their pixels dark, rows 2-3 none
        assert_eq!(blank_rows(&img, region, 128, 0.25), vec![0, 0, 1, 1]);
        assert_eq!(blank_columns(&img, region, 128, 0.25), vec![0, 0, 1, 1]);
        // With a high fraction everything is blank
        assert_eq!(blank_rows(&img, region, 128, 0.9), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_sum_profiles() {
        let mut img = GrayImage::from_pixel(3, 2, image::Luma([10]));
        img.put_pixel(2, 1, image::Luma([40]));
        let region = Rect::new(0, 0, 3, 2);
        assert_eq!(sum_rows(&img, region), vec![30, 60]);
        assert_eq!(sum_columns(&img, region), vec![20, 20, 50]);
    }

    proptest! {
        #[test]
        fn prop_sections_are_ordered_and_disjoint(
            profile in proptest::collection::vec(0u8..3, 0..64),
            min_sep in 0usize..6,
        ) {
            let sections = split_sections(&profile, min_sep);
            let mut prev_end = 0;
            for &(start, end) in &sections {
                prop_assert!(start < end);
                prop_assert!(start >= prev_end);
                prop_assert!(end <= profile.len());
                // Every section starts and ends on content samples
                prop_assert_eq!(profile[start], 0);
                prop_assert_eq!(profile[end - 1], 0);
                prev_end = end;
            }
        }
    }
}
