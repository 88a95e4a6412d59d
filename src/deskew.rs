//! Page straightening.
//!
//! The skew of a scanned page shows up in the angle of its vertical
//! separators. The page is straightened with a per-row horizontal shear so
//! that those separators become exactly vertical; segment and text
//! coordinates are shifted along with the pixels.

use crate::config::LayoutConfig;
use crate::geometry::Segment;
use crate::pipeline::TextFragment;
use image::GrayImage;

/// Estimate the skew angle (degrees) from the vertical segments.
///
/// Segments hugging the left/right 10% of the page are dismissed (scanner
/// edges). When no usable segment exists the neutral 90° is returned and a
/// warning is logged; the page is then left untouched by the shear.
fn detect_offset(segments: &[Segment], width: u32, config: &LayoutConfig) -> f64 {
    const BORDER: f64 = 0.1;

    let mut sum = 0.0;
    let mut count = 0u32;
    for s in segments {
        if !s.is_vertical(config.angle_tolerance) {
            continue;
        }
        let x_min = f64::from(s.start.x.min(s.end.x));
        let x_max = f64::from(s.start.x.max(s.end.x));
        if x_min < BORDER * f64::from(width) || x_max > (1.0 - BORDER) * f64::from(width) {
            continue;
        }
        sum += s.angle;
        count += 1;
    }

    if count == 0 {
        log::warn!("No vertical segment usable for deskew, assuming a straight page");
        return 90.0;
    }
    sum / f64::from(count)
}

/// Shear the page so its vertical separators stand upright.
///
/// Returns the straightened image and rewrites the segment and text-fragment
/// x-coordinates in place.
pub fn deskew(
    image: &GrayImage,
    segments: &mut [Segment],
    texts: &mut [TextFragment],
    config: &LayoutConfig,
) -> GrayImage {
    let (width, height) = image.dimensions();
    let angle = detect_offset(segments, width, config);
    log::info!("Detected skew angle: {}", angle);

    let c = (angle * std::f64::consts::PI / 180.0).cos() as f32;

    let mut out = GrayImage::new(width, height);
    let src: &[u8] = image.as_raw();
    let dst: &mut [u8] = &mut out;
    for y in 0..height as usize {
        let offset = y as f32 * c;
        let row = &src[y * width as usize..(y + 1) * width as usize];
        let out_row = &mut dst[y * width as usize..(y + 1) * width as usize];
        for x in 0..width as usize {
            let xin = x as f32 + offset;
            let x0 = xin.floor() as i64;
            let x1 = x0 + 1;

            if x1 <= 0 || x0 >= i64::from(width) - 1 {
                out_row[x] = 255;
            } else {
                let alpha = xin - x0 as f32;
                let a = f32::from(row[x0 as usize]);
                let b = f32::from(row[x1 as usize]);
                out_row[x] = ((1.0 - alpha) * a + alpha * b) as u8;
            }
        }
    }

    for s in segments.iter_mut() {
        s.start.x -= (s.start.y as f32 * c) as i32;
        s.end.x -= (s.end.y as f32 * c) as i32;
    }
    for t in texts.iter_mut() {
        t.bbox.x -= (t.bbox.y as f32 * c) as i32;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};

    fn vertical_segment(x: i32, angle: f64) -> Segment {
        Segment {
            start: Point::new(x, 10),
            end: Point::new(x, 110),
            width: 1.5,
            nfa: -20.0,
            length: 100.0,
            angle,
        }
    }

    #[test]
    fn test_no_segments_neutral_angle() {
        let config = LayoutConfig::default();
        assert_eq!(detect_offset(&[], 400, &config), 90.0);
        // Horizontal segments do not contribute either
        let horizontal = Segment {
            start: Point::new(50, 20),
            end: Point::new(300, 20),
            width: 1.0,
            nfa: -20.0,
            length: 250.0,
            angle: 0.5,
        };
        assert_eq!(detect_offset(&[horizontal], 400, &config), 90.0);
    }

    #[test]
    fn test_border_segments_dismissed() {
        let config = LayoutConfig::default();
        // One segment in the left margin, one in the body
        let segs = [vertical_segment(10, 88.0), vertical_segment(200, 92.0)];
        assert_eq!(detect_offset(&segs, 400, &config), 92.0);
    }

    #[test]
    fn test_angle_is_averaged() {
        let config = LayoutConfig::default();
        let segs = [vertical_segment(150, 89.0), vertical_segment(250, 91.0)];
        assert_eq!(detect_offset(&segs, 400, &config), 90.0);
    }

    #[test]
    fn test_neutral_deskew_is_identity() {
        // angle 90 => cos = 0 => no shear
        let mut img = GrayImage::from_pixel(20, 20, image::Luma([255]));
        img.put_pixel(10, 10, image::Luma([0]));
        let mut segments = [vertical_segment(10, 90.0)];
        let mut texts = [TextFragment {
            bbox: Rect::new(5, 5, 4, 4),
            text: "x".into(),
        }];
        let out = deskew(&img, &mut segments, &mut texts, &LayoutConfig::default());
        assert_eq!(out.get_pixel(10, 10).0[0], 0);
        assert_eq!(out.get_pixel(9, 10).0[0], 255);
        assert_eq!(segments[0].start.x, 10);
        assert_eq!(texts[0].bbox.x, 5);
    }
}
