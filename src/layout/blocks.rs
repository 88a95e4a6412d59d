//! Recursive block/column segmentation.
//!
//! Alternates vertical and horizontal projection-profile splitting to build
//! the page → title/section → column hierarchy, consulting the detected
//! separator segments to force splits (horizontal rules) or suppress them
//! (vertical rules bridging a gap).

use crate::config::LayoutConfig;
use crate::dom::{DomNode, NodeKind};
use crate::error::{Error, Result};
use crate::filters::{open_hline, open_vline};
use crate::geometry::{Interval, IntervalSet, Rect, Segment};
use crate::layout::profile::{
    blank_columns, blank_rows, blank_rows_into, split_sections, sum_columns, sum_rows, FORCED,
};
use image::GrayImage;

/// Gray value above which a pixel counts as background during block
/// segmentation (stricter than the configurable white level, which is
/// reserved for separator-free profiles).
const WHITE_THRESHOLD: u8 = 200;

/// Margin added around every detected block.
const EXTRA_MARGIN: i32 = 2;

/// Result of the block segmentation pass.
pub struct BlockExtraction {
    /// The page tree, populated down to `ColumnLevel2` nodes.
    pub document: DomNode,
    /// Input pre-conditioned for block processing (letters and lines
    /// connected into blocks).
    pub blocks: GrayImage,
    /// Same image with thin vertical separators removed.
    pub blocks_clean: GrayImage,
}

/// Detect one border pair along an axis of partial sums.
///
/// `sums[i]` is the gray-value sum of row/column `i`; `len` is the number of
/// summed pixels. Starts from the 1/10 and 9/10 positions and walks outward
/// over dark lines (or inward over white ones) until the content edge.
fn detect_border(sums: &[i64], len: u32) -> (usize, usize) {
    const BORDER_PAGE_RATIO: usize = 10;
    const FULL_LINE_WHITE: f32 = 0.95;

    let n = sums.len();
    let mut l = n / BORDER_PAGE_RATIO;
    let mut r = (BORDER_PAGE_RATIO - 1) * n / BORDER_PAGE_RATIO;
    let threshold = (f32::from(WHITE_THRESHOLD) * len as f32 * FULL_LINE_WHITE) as i64;

    if sums[l] < threshold {
        while l > 0 && sums[l] < threshold {
            l -= 1;
        }
    } else {
        while l < r && sums[l] > threshold {
            l += 1;
        }
    }

    if sums[r] < threshold {
        while r < n - 1 && sums[r] < threshold {
            r += 1;
        }
    } else {
        while r > l && sums[r] > threshold {
            r -= 1;
        }
    }
    (l, r + 1)
}

/// Compute the content region of the page, ignoring scan borders.
fn content_box(input: &GrayImage, config: &LayoutConfig) -> Rect {
    let (width, height) = input.dimensions();
    let full = Rect::new(0, 0, width as i32, height as i32);

    // Left/right border: smear the page vertically, then look at per-column
    // sums
    let (x0, x1) = {
        let hblock = open_vline(input, config.page_opening_height / 2);
        let sums = sum_columns(&hblock, full);
        detect_border(&sums, height)
    };

    // Top/bottom border: smear horizontally, connect lines into blocks, then
    // look at per-row sums
    let (y0, y1) = {
        let vblock = open_hline(input, config.page_opening_width / 2);
        let vblock2 = open_vline(&vblock, config.block_opening_height);
        let sums = sum_rows(&vblock2, full);
        detect_border(&sums, width)
    };

    let roi = Rect::from_corners(x0 as i32, y0 as i32, x1 as i32, y1 as i32);
    log::debug!(
        "Document border (x1,y1,x2,y2): {} {} {} {}",
        roi.x,
        roi.y,
        roi.x1(),
        roi.y1()
    );
    roi
}

struct BlockSegmenter<'a> {
    segments: Vec<Segment>,
    blocks: &'a GrayImage,
    blocks_clean: &'a GrayImage,
    config: &'a LayoutConfig,
}

impl<'a> BlockSegmenter<'a> {
    fn visit(&self, node: &mut DomNode, level: usize) -> Result<()> {
        match node.kind {
            NodeKind::Page | NodeKind::ColumnLevel1 => self.vsplit(node, level),
            NodeKind::SectionLevel1 | NodeKind::SectionLevel2 => self.hsplit(node, level),
            _ => Ok(()),
        }
    }

    /// Split vertically (stacked title/section regions separated by
    /// horizontal gaps).
    fn vsplit(&self, node: &mut DomNode, level: usize) -> Result<()> {
        let region = node.bbox;
        let config = self.config;
        let tolerance = config.angle_tolerance;

        // Collect the segments of the region: horizontal ones may force a
        // break, vertical ones deep inside the region may suppress one
        let mut region_segments = Vec::new();
        let mut hor_segments = Vec::new();
        let mut ver_segments = IntervalSet::new();
        {
            let outer = region;
            let mut inner = region;
            inner.inflate(-10);

            for seg in &self.segments {
                if outer.contains_segment(seg) {
                    region_segments.push(*seg);
                }
                if seg.is_horizontal(tolerance) && outer.contains_segment(seg) {
                    hor_segments.push(*seg);
                } else if seg.is_vertical(tolerance) && inner.contains_segment(seg) {
                    ver_segments.insert(seg.start.y, seg.end.y);
                }
            }
        }

        // Blank-line profile. At page level a blank line is 90% white
        // pixels (separators eat into the margin). Below that, a line is
        // blank when both the first third is 95% white (a line can be a
        // single word as wide as a centered separator) and the middle third
        // is 70% white (a centered title must not read as blank).
        let mut ysum: Vec<u8>;
        if node.kind == NodeKind::Page {
            ysum = blank_rows(self.blocks, region, WHITE_THRESHOLD, 0.10);
        } else {
            let h = region.height.max(0) as usize;
            let third = region.width / 3;

            let first = Rect::new(region.x, region.y, third, region.height);
            ysum = blank_rows(self.blocks, first, WHITE_THRESHOLD, 0.05);

            let middle = Rect::new(region.x + third, region.y, third, region.height);
            let mut middle_profile = vec![0u8; h];
            blank_rows_into(self.blocks, middle, WHITE_THRESHOLD, 0.30, &mut middle_profile);

            for i in 0..h {
                ysum[i] = ysum[i].min(middle_profile[i]); // min <=> logical and
            }
        }

        // Every horizontal segment spanning at least 25% of the region
        // width forces a break around its rows
        for s in &hor_segments {
            if s.length < 0.25 * f64::from(region.width) {
                continue;
            }
            log::debug!(
                "Horizontal split forced by segment (y={}, x1={} x2={} angle={})",
                s.start.y,
                s.start.x,
                s.end.x,
                s.angle
            );
            let y0 = (s.start.y - region.y - 3).max(0);
            let y1 = (s.end.y + 3).min(region.y1()) - region.y;
            for y in y0..y1 {
                ysum[y as usize] = FORCED;
            }
        }

        let ranges = split_sections(&ysum, 0);
        log::debug!(
            "{:indent$}** Horizontal split - number of regions={}",
            "",
            ranges.len(),
            indent = level * 2
        );

        let mut last: Option<usize> = None;
        let mut last_y = 0i32;
        for (start, end) in ranges {
            let mut y0 = start as i32;
            let mut y1 = end as i32;
            let h = y1 - y0;

            // A very flat candidate is a leftover separator, not content
            if (h as f32) < 0.25 * (config.line_height / 2.0) {
                continue;
            }

            let gap_is_small =
                last.is_some() && ((y0 - last_y) as f32) < 0.5 * config.block_opening_height as f32;
            let gap_is_bridged = !gap_is_small
                && last.is_some()
                && ver_segments.overlaps(Interval::new(last_y + region.y, y0 + region.y), 0.80);

            let merge_target = last.filter(|_| gap_is_small || gap_is_bridged);
            let slot = if let Some(idx) = merge_target {
                log::debug!(
                    "{:indent$} The block [{}-{}] merges into the previous one (lasty={}, {})",
                    "",
                    y0,
                    y1,
                    last_y,
                    if gap_is_small { "gap too small" } else { "bridged by a segment" },
                    indent = level * 2
                );
                last_y = y1;
                y0 = node.children[idx].bbox.y;
                y1 += region.y;
                idx
            } else {
                last_y = y1;
                y0 += region.y - EXTRA_MARGIN;
                y1 += region.y + EXTRA_MARGIN;
                node.children.push(DomNode::new(NodeKind::Page, Rect::default()));
                node.children.len() - 1
            };

            // A short block is a title; which level depends on the parent
            let kind = if ((y1 - y0) as f32) < 3.0 * (config.line_height / 2.0) {
                match node.kind {
                    NodeKind::Page => NodeKind::TitleLevel1,
                    NodeKind::ColumnLevel1 => NodeKind::TitleLevel2,
                    _ => {
                        return Err(Error::InvalidLayout {
                            parent: node.kind,
                            requested: "title",
                        })
                    }
                }
            } else {
                match node.kind {
                    NodeKind::Page => NodeKind::SectionLevel1,
                    NodeKind::ColumnLevel1 => NodeKind::SectionLevel2,
                    _ => {
                        return Err(Error::InvalidLayout {
                            parent: node.kind,
                            requested: "section",
                        })
                    }
                }
            };

            let y0 = y0.max(region.y);
            let y1 = y1.min(region.y1());
            node.children[slot] = DomNode::new(kind, Rect::new(region.x, y0, region.width, y1 - y0));
            last = Some(slot);
            log::debug!(
                "{:indent$} Detected y-section [{}--{}]",
                "",
                y0,
                y1,
                indent = level * 2
            );
        }

        // Recurse with the region-filtered segment subset
        let child_segmenter = BlockSegmenter {
            segments: region_segments,
            blocks: self.blocks,
            blocks_clean: self.blocks_clean,
            config,
        };
        for child in &mut node.children {
            log::debug!(
                "{:indent$} Processing y-section [y={},h={}]",
                "",
                child.bbox.y,
                child.bbox.height,
                indent = level * 2
            );
            child_segmenter.visit(child, level + 1)?;
        }
        Ok(())
    }

    /// Split horizontally (side-by-side columns separated by vertical gaps).
    fn hsplit(&self, node: &mut DomNode, level: usize) -> Result<()> {
        let region = node.bbox;
        let config = self.config;

        let ver_segments: Vec<Segment> = self
            .segments
            .iter()
            .filter(|s| region.contains_segment(s) && s.is_vertical(config.angle_tolerance))
            .copied()
            .collect();

        // Blank-column profile over the separator-free image
        let mut rnks = blank_columns(self.blocks_clean, region, config.white_level, 0.02);

        // Force a break around every vertical separator
        for s in &ver_segments {
            log::debug!(
                "Vertical split forced by segment (x={}, y1={} y2={} angle={})",
                s.start.x,
                s.start.y,
                s.end.y,
                s.angle
            );
            let x = (s.start.x + s.end.x) as f32 / 2.0 - region.x as f32;
            let x0 = (x - (3 * EXTRA_MARGIN) as f32).max(0.0) as i32;
            let x1 = (x + (3 * EXTRA_MARGIN) as f32).min(region.width as f32) as i32;
            for xi in x0..x1 {
                rnks[xi as usize] = FORCED;
            }
        }

        let min_gap = (0.75 * (config.column_spacing / 2.0)) as usize;
        let columns = split_sections(&rnks, min_gap);
        log::debug!(
            "{:indent$}** Vertical split - number of regions={}",
            "",
            columns.len(),
            indent = level * 2
        );

        for (start, end) in columns {
            let kind = match node.kind {
                NodeKind::SectionLevel1 => NodeKind::ColumnLevel1,
                NodeKind::SectionLevel2 => NodeKind::ColumnLevel2,
                _ => {
                    return Err(Error::InvalidLayout {
                        parent: node.kind,
                        requested: "column",
                    })
                }
            };

            let x0 = region.x.max(region.x + start as i32 - 3 * EXTRA_MARGIN);
            let x1 = region.x1().min(region.x + end as i32 + 3 * EXTRA_MARGIN);
            if x1 <= x0 {
                continue; // degenerate region, skip
            }
            log::debug!(
                "{:indent$} Detected x-section [{}--{}]",
                "+",
                x0,
                x1,
                indent = level * 2
            );
            node.add_child(DomNode::new(kind, Rect::new(x0, region.y, x1 - x0, region.height)));
        }

        for child in &mut node.children {
            log::debug!(
                "{:indent$} Processing x-section [x={},w={}]",
                "",
                child.bbox.x,
                child.bbox.width,
                indent = level * 2
            );
            self.visit(child, level + 1)?;
        }
        Ok(())
    }
}

/// Run the recursive block/column segmentation over a page image.
///
/// `input` is the (deskewed, possibly subsampled) page raster; `segments`
/// the separator set at the same scale. Returns the page tree populated down
/// to `ColumnLevel2` nodes together with the pre-conditioned images.
pub fn extract_blocks(
    input: &GrayImage,
    segments: &[Segment],
    config: &LayoutConfig,
) -> Result<BlockExtraction> {
    let (width, height) = input.dimensions();
    if width < 4 || height < 4 {
        return Err(Error::DegeneratePage { width, height });
    }

    let roi = content_box(input, config);

    // Connect letters/words and lines into blocks
    let blocks = open_vline(input, config.block_opening_height / 2);
    let blocks = open_hline(&blocks, config.block_opening_width / 2);

    // Remove thin vertical separators with a horizontal rank filter
    let blocks_clean = imageproc::filter::median_filter(&blocks, 3, 0);

    let mut document = DomNode::page(roi);

    let mut sorted_segments = segments.to_vec();
    sorted_segments.sort_by_key(|s| s.start.y);

    let segmenter = BlockSegmenter {
        segments: sorted_segments,
        blocks: &blocks,
        blocks_clean: &blocks_clean,
        config,
    };
    segmenter.visit(&mut document, 0)?;

    Ok(BlockExtraction {
        document,
        blocks,
        blocks_clean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect as IRect;

    fn white_page(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([255]))
    }

    fn fill(img: &mut GrayImage, x: i32, y: i32, w: u32, h: u32) {
        draw_filled_rect_mut(img, IRect::at(x, y).of_size(w, h), Luma([0]));
    }

    fn horizontal_rule(x0: i32, x1: i32, y: i32) -> Segment {
        Segment {
            start: Point::new(x0, y),
            end: Point::new(x1, y),
            width: 2.0,
            nfa: -50.0,
            length: f64::from(x1 - x0),
            angle: 0.0,
        }
    }

    #[test]
    fn test_detect_border_white_page() {
        // All-white sums: both probes walk inward and meet
        let sums = vec![255 * 100i64; 50];
        let (l, r) = detect_border(&sums, 100);
        assert!(l <= r);
    }

    #[test]
    fn test_detect_border_finds_content() {
        // 100 columns, 200 px tall; content (dark sums) in columns 30..70
        let mut sums = vec![255 * 200i64; 100];
        for s in sums.iter_mut().take(70).skip(30) {
            *s = 10 * 200;
        }
        let (l, r) = detect_border(&sums, 200);
        assert_eq!(l, 30);
        assert_eq!(r, 70);
    }

    #[test]
    fn test_two_stacked_sections() {
        // Two solid blocks separated by a 60 px white band
        let mut img = white_page(400, 600);
        fill(&mut img, 60, 80, 280, 180);
        fill(&mut img, 60, 320, 280, 200);

        let result = extract_blocks(&img, &[], &LayoutConfig::default()).unwrap();
        let page = &result.document;
        assert_eq!(page.kind, NodeKind::Page);
        assert_eq!(page.children.len(), 2);
        for child in &page.children {
            assert_eq!(child.kind, NodeKind::SectionLevel1);
        }
        // The boxes stay inside the page region and stack top to bottom
        assert!(page.children[0].bbox.y1() <= page.children[1].bbox.y);
        for child in &page.children {
            assert!(child.bbox.y >= page.bbox.y);
            assert!(child.bbox.y1() <= page.bbox.y1());
        }
    }

    #[test]
    fn test_short_block_is_a_title() {
        // A 25 px tall block (under 3 * line_height / 2 = 45) over a tall one
        let mut img = white_page(400, 600);
        fill(&mut img, 60, 80, 280, 25);
        fill(&mut img, 60, 180, 280, 300);

        let result = extract_blocks(&img, &[], &LayoutConfig::default()).unwrap();
        let kinds: Vec<NodeKind> = result.document.children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![NodeKind::TitleLevel1, NodeKind::SectionLevel1]);
    }

    #[test]
    fn test_rule_forces_split_of_contiguous_content() {
        // One solid block; a wide horizontal rule in the middle forces two
        // sections even though no blank band exists
        let mut img = white_page(400, 600);
        fill(&mut img, 60, 80, 280, 440);
        let rule = horizontal_rule(80, 320, 300);

        let result = extract_blocks(&img, &[rule], &LayoutConfig::default()).unwrap();
        let page = &result.document;
        assert_eq!(page.children.len(), 2);
        assert!(page
            .children
            .iter()
            .all(|c| c.kind == NodeKind::SectionLevel1));
    }

    #[test]
    fn test_sections_get_columns() {
        // Two side-by-side solid blocks with a wide white gutter
        let mut img = white_page(500, 500);
        fill(&mut img, 60, 80, 150, 340);
        fill(&mut img, 290, 80, 150, 340);

        let result = extract_blocks(&img, &[], &LayoutConfig::default()).unwrap();
        let page = &result.document;
        assert_eq!(page.children.len(), 1);
        let section = &page.children[0];
        assert_eq!(section.kind, NodeKind::SectionLevel1);
        assert_eq!(section.children.len(), 2);
        for column in &section.children {
            assert_eq!(column.kind, NodeKind::ColumnLevel1);
        }
        // Containment invariant after the whole pass
        result.document.walk(&mut |node| {
            if let Some(union) = node.children_bbox() {
                assert!(node.bbox.x <= union.x && union.x1() <= node.bbox.x1());
                assert!(node.bbox.y <= union.y && union.y1() <= node.bbox.y1());
            }
        });
    }
}
