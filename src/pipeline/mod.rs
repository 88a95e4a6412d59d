//! Pipeline orchestration.
//!
//! One page is processed start to finish by a single synchronous call. The
//! run may be interrupted only at stage boundaries through a cooperative
//! cancellation flag; a canceled run returns [`Error::Canceled`] and leaves
//! no structural output. Progress is reported through a side-channel
//! observer invoked with monotonically increasing percentages at fixed stage
//! boundaries.

use crate::config::LayoutConfig;
use crate::deskew::deskew;
use crate::dom::DomNode;
use crate::error::{Error, Result};
use crate::geometry::{Rect, Segment};
use crate::layout::{assign_text, extract_blocks, extract_entries, extract_lines};
use crate::scale::{resolve_scale, subsample, upsample_labels};
use crate::LabelImage;
use image::GrayImage;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// A text span produced by OCR or the vector-text extractor.
#[derive(Debug, Clone)]
pub struct TextFragment {
    /// Bounding box in page pixels.
    pub bbox: Rect,
    /// Recognized text.
    pub text: String,
}

/// Everything the pipeline consumes for one page.
pub struct PageInput {
    /// Grayscale page raster (8-bit).
    pub image: GrayImage,
    /// Detected straight-line separators, already filtered to this page.
    pub segments: Vec<Segment>,
    /// Text fragments, in arbitrary order.
    pub texts: Vec<TextFragment>,
}

/// Everything the pipeline produces for one page.
pub struct PageAnalysis {
    /// The finished document tree, at the input image's resolution.
    pub document: DomNode,
    /// Watershed label image, upsampled back to the input resolution
    /// (label 0 = background/waterline, 1.. = lines).
    pub labels: LabelImage,
    /// Deskewed separator segments (for display overlays).
    pub segments: Vec<Segment>,
    /// Deskewed text fragments (for display overlays).
    pub texts: Vec<TextFragment>,
}

/// Cooperative cancellation flag and progress observer.
///
/// The cancellation flag is checked between pipeline stages only. Observer
/// panics are contained and logged; they never abort processing.
#[derive(Default)]
pub struct Progress {
    canceled: AtomicBool,
    observer: Option<Box<dyn Fn(u32) + Send + Sync>>,
}

impl Progress {
    /// Create a progress handle without an observer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a progress handle reporting percentages to `observer`.
    pub fn with_observer(observer: impl Fn(u32) + Send + Sync + 'static) -> Self {
        Self {
            canceled: AtomicBool::new(false),
            observer: Some(Box::new(observer)),
        }
    }

    /// Request cancellation; the pipeline stops at the next stage boundary.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    fn update(&self, percent: u32) {
        if let Some(observer) = &self.observer {
            if catch_unwind(AssertUnwindSafe(|| observer(percent))).is_err() {
                log::warn!("Progress observer panicked at {}%", percent);
            }
        }
    }
}

/// Check the cancellation flag and report a stage boundary.
fn checkpoint(progress: Option<&Progress>, percent: u32) -> Result<()> {
    if let Some(p) = progress {
        if p.is_canceled() {
            return Err(Error::Canceled);
        }
        p.update(percent);
    }
    Ok(())
}

/// Run the whole structure extraction pipeline over one page.
///
/// Stages: scale detection → deskew → subsampling → block segmentation →
/// line extraction → rescale → entry grouping → text assignment. The
/// optional [`Progress`] handle is consulted at every stage boundary.
///
/// # Errors
///
/// Returns [`Error::Canceled`] when canceled, [`Error::DegeneratePage`] for
/// unusably small inputs, and [`Error::InvalidLayout`] when the segmentation
/// pass meets a structurally impossible node nesting.
pub fn analyze_page(
    input: PageInput,
    config: &LayoutConfig,
    progress: Option<&Progress>,
) -> Result<PageAnalysis> {
    let PageInput {
        image,
        mut segments,
        mut texts,
    } = input;

    let (width, height) = image.dimensions();
    if width < 4 || height < 4 {
        return Err(Error::DegeneratePage { width, height });
    }
    let scale = resolve_scale(width);

    checkpoint(progress, 10)?;

    // 1. Deskew the page; segment and text coordinates follow the pixels
    let clock = Instant::now();
    let deskewed = deskew(&image, &mut segments, &mut texts, config);
    log::info!("Document deskew computed in {} ms", clock.elapsed().as_millis());

    checkpoint(progress, 30)?;

    // 2. Bring the page to the working resolution
    let (working, working_segments) = if scale == 0 {
        let clock = Instant::now();
        let sub = subsample(&deskewed);
        let mut segs = segments.clone();
        for s in &mut segs {
            s.scale(0.5);
        }
        log::info!("Subsampling computed in {} ms", clock.elapsed().as_millis());
        (sub, segs)
    } else {
        (deskewed, segments.clone())
    };

    // 3. Recursive block/column segmentation
    let clock = Instant::now();
    let extraction = extract_blocks(&working, &working_segments, config)?;
    let mut document = extraction.document;
    log::info!("Blocks detection computed in {} ms", clock.elapsed().as_millis());

    checkpoint(progress, 50)?;

    // 4. Watershed line extraction
    let clock = Instant::now();
    let mut labels = extract_lines(&mut document, &working, config);
    log::info!("Lines detection computed in {} ms", clock.elapsed().as_millis());

    checkpoint(progress, 60)?;

    // 5. Back to the input resolution
    if scale == 0 {
        let clock = Instant::now();
        document.scale(2.0);
        labels = upsample_labels(&labels, width, height);
        log::info!("Upsampling computed in {} ms", clock.elapsed().as_millis());
    }

    checkpoint(progress, 70)?;

    // 6. Group lines into entries
    let clock = Instant::now();
    extract_entries(&mut document);
    log::info!("Entries detection computed in {} ms", clock.elapsed().as_millis());

    checkpoint(progress, 80)?;

    // 7. Attach the text fragments
    let clock = Instant::now();
    assign_text(&mut document, &texts, config);
    log::info!("Text extraction computed in {} ms", clock.elapsed().as_millis());

    if let Some(p) = progress {
        p.update(100);
    }

    Ok(PageAnalysis {
        document,
        labels,
        segments,
        texts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Arc;

    fn blank_input(w: u32, h: u32) -> PageInput {
        PageInput {
            image: GrayImage::from_pixel(w, h, image::Luma([255])),
            segments: Vec::new(),
            texts: Vec::new(),
        }
    }

    #[test]
    fn test_canceled_run_yields_no_output() {
        let progress = Progress::new();
        progress.cancel();
        let result = analyze_page(blank_input(1024, 256), &LayoutConfig::default(), Some(&progress));
        assert!(matches!(result, Err(Error::Canceled)));
    }

    #[test]
    fn test_degenerate_page_is_rejected() {
        let result = analyze_page(blank_input(2, 2), &LayoutConfig::default(), None);
        assert!(matches!(result, Err(Error::DegeneratePage { .. })));
    }

    #[test]
    fn test_progress_is_monotone() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::with_observer(move |p| sink.lock().unwrap().push(p));

        analyze_page(blank_input(1024, 256), &LayoutConfig::default(), Some(&progress)).unwrap();

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[test]
    fn test_observer_panic_does_not_abort() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let progress = Progress::with_observer(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
            panic!("observer bug");
        });

        let result = analyze_page(blank_input(1024, 256), &LayoutConfig::default(), Some(&progress));
        assert!(result.is_ok());
        assert!(calls.load(Ordering::Relaxed) > 1);
    }
}
