//! Watershed-based line extraction.
//!
//! Each `ColumnLevel2` region is blurred with a strongly anisotropic
//! Gaussian (much more vertical than horizontal smoothing is *not* what we
//! want: lines must smear sideways into solid bands, so the horizontal sigma
//! is large and the vertical one small). The left edge of the blurred column
//! seeds one marker per local intensity minimum, and a priority-flood
//! watershed over the closed relief carves the column into line bands.

use crate::config::LayoutConfig;
use crate::dom::{DomNode, NodeKind};
use crate::filters::{close_rect, directional_gaussian, dynamic_closing, open_hline};
use crate::geometry::Rect;
use crate::layout::watershed::watershed;
use crate::LabelImage;
use image::{imageops, GrayImage, Luma};

/// Clamp a node box to the image bounds.
fn clamp_to_image(bbox: Rect, width: u32, height: u32) -> Rect {
    let x0 = bbox.x.clamp(0, width as i32);
    let y0 = bbox.y.clamp(0, height as i32);
    let x1 = bbox.x1().clamp(0, width as i32);
    let y1 = bbox.y1().clamp(0, height as i32);
    Rect::from_corners(x0, y0, x1, y1)
}

/// Mark the local minima of the first column of `region` with fresh labels.
///
/// A sample is a local minimum if no strictly smaller neighbor blocks the
/// propagation of "minimum-ness" from either side (forward + backward
/// monotone sweep with border sentinels at the maximal intensity). One
/// marker is placed at the first row of each minimum plateau.
fn seed_local_minima(
    blurred: &GrayImage,
    markers: &mut LabelImage,
    region: Rect,
    mut next_label: i32,
) -> i32 {
    let h = region.height.max(0) as usize;
    if h == 0 || region.width <= 0 {
        return next_label;
    }
    let x = region.x as u32;
    let y0 = region.y;

    // Column values with border sentinels fixed at the maximal intensity
    let mut vals = vec![255i32; h + 2];
    for i in 0..h {
        vals[i + 1] = i32::from(blurred.get_pixel(x, (y0 + i as i32) as u32).0[0]);
    }

    let mut is_min = vec![true; h + 2];

    // Forward sweep
    for i in 1..=h {
        if vals[i - 1] < vals[i] {
            is_min[i] = false;
        } else if vals[i - 1] <= vals[i] && !is_min[i - 1] {
            is_min[i] = false;
        }
    }
    // Backward sweep
    for i in (1..=h).rev() {
        if vals[i + 1] < vals[i] {
            is_min[i] = false;
        } else if vals[i + 1] <= vals[i] && !is_min[i + 1] {
            is_min[i] = false;
        }
    }

    // One marker per plateau start
    is_min[0] = false;
    for i in 1..=h {
        if is_min[i] && !is_min[i - 1] {
            next_label += 1;
            markers.put_pixel(x, (y0 + i as i32 - 1) as u32, Luma([next_label]));
        }
    }
    next_label
}

/// Detect the text lines of every `ColumnLevel2` node and append them as
/// `Line` children.
///
/// Returns the watershed label image (label 0 = waterline/background,
/// labels 1.. = lines in reading order).
pub fn extract_lines(document: &mut DomNode, input: &GrayImage, config: &LayoutConfig) -> LabelImage {
    let (width, height) = input.dimensions();

    // Give matter to the letters (merge letters/words but not lines)
    let f = open_hline(input, config.block_opening_width / 2);

    let mut blurred = GrayImage::from_pixel(width, height, Luma([255]));
    let mut markers = LabelImage::new(width, height);
    let mut next_label = 0i32;

    // 1. Blur each column and place the watershed markers
    let h_sigma = config.word_width * 0.5;
    let v_sigma = (config.line_height * 0.5) * 0.1;
    document.walk(&mut |node| {
        if node.kind != NodeKind::ColumnLevel2 {
            return;
        }
        let region = clamp_to_image(node.bbox, width, height);
        if region.is_empty() {
            return; // degenerate region, skip
        }
        let clip = imageops::crop_imm(
            &f,
            region.x as u32,
            region.y as u32,
            region.width as u32,
            region.height as u32,
        )
        .to_image();
        let smeared = directional_gaussian(&clip, h_sigma, v_sigma, 255);
        imageops::replace(&mut blurred, &smeared, i64::from(region.x), i64::from(region.y));

        next_label = seed_local_minima(&blurred, &mut markers, region, next_label);
    });
    log::debug!("Line markers seeded: {}", next_label);

    // 2. Close the relief so that only line-scale basins survive
    let close_w = (config.word_width * 0.5 + 0.5) as u32;
    let close_h = ((config.line_height * 0.5) / 3.0 + 0.5) as u32;
    let clo = close_rect(&blurred, close_w / 2, close_h / 2);
    let clo = dynamic_closing(&clo, config.closing_dynamic);

    // 3. Flood
    watershed(&clo, &mut markers);

    // 4. Per-label bounding boxes over the dark pixels of each column
    let white_level = config.white_level;
    document.walk_mut(&mut |node| {
        if node.kind != NodeKind::ColumnLevel2 {
            return;
        }
        let region = clamp_to_image(node.bbox, width, height);
        if region.is_empty() {
            return;
        }

        let mut boxes: Vec<Option<Rect>> = vec![None; next_label as usize + 1];
        for y in region.y..region.y1() {
            for x in region.x..region.x1() {
                if input.get_pixel(x as u32, y as u32).0[0] >= white_level {
                    continue;
                }
                let label = markers.get_pixel(x as u32, y as u32).0[0];
                if label <= 0 {
                    continue;
                }
                let px = Rect::new(x, y, 1, 1);
                match &mut boxes[label as usize] {
                    Some(b) => b.merge(px),
                    slot => *slot = Some(px),
                }
            }
        }

        for (label, bbox) in boxes.iter().enumerate().skip(1) {
            if let Some(bbox) = bbox {
                node.add_child(DomNode::line(label as i32, *bbox));
            }
        }
        log::debug!(
            "Column [x={},y={}]: {} lines",
            node.bbox.x,
            node.bbox.y,
            node.children.len()
        );
    });

    markers
}
