//! Working-resolution handling.
//!
//! Pages are processed at roughly 1024 px width. A full-resolution scan
//! (~2048 px) is subsampled by two before segmentation and the results are
//! scaled back afterwards; an already-halved input is processed as-is.

use crate::LabelImage;
use image::GrayImage;

/// Reference width of a full-resolution page scan.
const REFERENCE_WIDTH: f32 = 2048.0;

/// Detect the scale of a page image from its width.
///
/// Scale 0 is a full-resolution scan, scale 1 an image already halved.
/// Returns `None` when the width does not snap to a power-of-two fraction of
/// the reference width.
pub fn detect_scale(width: u32) -> Option<i32> {
    let s = (REFERENCE_WIDTH / width as f32).log2();
    let rs = s.round();
    if (s - rs).abs() > 0.2 {
        None
    } else {
        Some(rs as i32)
    }
}

/// Resolve the working scale for a page, clamping anything unsupported to 0.
pub fn resolve_scale(width: u32) -> i32 {
    match detect_scale(width) {
        None => {
            log::error!("The scale cannot be properly detected. It is set to 0.");
            0
        }
        Some(s) if s != 0 && s != 1 => {
            log::error!("The scale {} is not handled. Running with scale = 0.", s);
            0
        }
        Some(s) => {
            log::info!("Running at scale={}.", s);
            s
        }
    }
}

/// Half-resolution subsampling by 2x2 block averaging.
pub fn subsample(input: &GrayImage) -> GrayImage {
    let (width, height) = input.dimensions();
    let (w, h) = (width / 2, height / 2);

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let (x0, y0) = (2 * x, 2 * y);
            let sum = u32::from(input.get_pixel(x0, y0).0[0])
                + u32::from(input.get_pixel(x0 + 1, y0).0[0])
                + u32::from(input.get_pixel(x0, y0 + 1).0[0])
                + u32::from(input.get_pixel(x0 + 1, y0 + 1).0[0]);
            out.put_pixel(x, y, image::Luma([(sum / 4) as u8]));
        }
    }
    out
}

/// Nearest-neighbor upsampling of a label image to the given domain.
pub fn upsample_labels(input: &LabelImage, width: u32, height: u32) -> LabelImage {
    let (iw, ih) = input.dimensions();
    let sx = iw as f32 / width as f32;
    let sy = ih as f32 / height as f32;

    let mut out = LabelImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let lx = ((x as f32 * sx) as u32).min(iw.saturating_sub(1));
            let ly = ((y as f32 * sy) as u32).min(ih.saturating_sub(1));
            out.put_pixel(x, y, *input.get_pixel(lx, ly));
        }
    }
    out
}
