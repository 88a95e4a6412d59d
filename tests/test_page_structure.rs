//! End-to-end tests over synthetic pages.
//!
//! The pages are drawn as stacks of solid "text line" strips: tall enough
//! stacks read as sections, the strips themselves come back as watershed
//! lines. A horizontal rule provided by the (simulated) separator detector
//! must force a section split even where the ink is contiguous.

use docstrata::{analyze_page, LayoutConfig, NodeKind, PageInput, Point, Progress, Rect, Segment, TextFragment};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as IRect;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Draw a band of text-line strips: `count` strips of height `strip_h`
/// starting at `y`, spaced `period` apart.
fn draw_band(img: &mut GrayImage, x: i32, width: u32, y: i32, count: i32, strip_h: u32, period: i32) {
    for k in 0..count {
        draw_filled_rect_mut(
            img,
            IRect::at(x, y + k * period).of_size(width, strip_h),
            Luma([0]),
        );
    }
}

fn horizontal_rule(x0: i32, x1: i32, y: i32) -> Segment {
    Segment {
        start: Point::new(x0, y),
        end: Point::new(x1, y),
        width: 2.0,
        nfa: -80.0,
        length: f64::from(x1 - x0),
        angle: 0.0,
    }
}

/// A 1024x800 page (working scale): three bands of strips, the gaps between
/// bands small enough that the ink reads as one contiguous mass, and one
/// detected rule between bands two and three.
///
/// Bands: A = 11 strips from y=100, B = 11 strips from y=298, C = 10 strips
/// from y=496; strips are 10 px tall with 8 px gaps, x = 120..900.
fn working_scale_page() -> PageInput {
    let mut img = GrayImage::from_pixel(1024, 800, Luma([255]));
    draw_band(&mut img, 120, 780, 100, 11, 10, 18);
    draw_band(&mut img, 120, 780, 298, 11, 10, 18);
    draw_band(&mut img, 120, 780, 496, 10, 10, 18);

    PageInput {
        image: img,
        segments: vec![horizontal_rule(200, 700, 494)],
        texts: vec![
            TextFragment {
                bbox: Rect::new(130, 101, 60, 8),
                text: "alpha".to_string(),
            },
            TextFragment {
                bbox: Rect::new(250, 101, 60, 8),
                text: "beta".to_string(),
            },
        ],
    }
}

fn assert_containment(node: &docstrata::DomNode) {
    node.walk(&mut |n| {
        if let Some(union) = n.children_bbox() {
            assert!(n.bbox.x <= union.x, "{:?} box does not cover children", n.kind);
            assert!(n.bbox.y <= union.y, "{:?} box does not cover children", n.kind);
            assert!(union.x1() <= n.bbox.x1(), "{:?} box does not cover children", n.kind);
            assert!(union.y1() <= n.bbox.y1(), "{:?} box does not cover children", n.kind);
        }
    });
}

#[test]
fn test_rule_forces_exactly_two_sections() {
    init_logs();
    let input = working_scale_page();
    let analysis = analyze_page(input, &LayoutConfig::default(), None).unwrap();
    let page = &analysis.document;

    assert_eq!(page.kind, NodeKind::Page);
    assert_eq!(page.children.len(), 2);
    for section in &page.children {
        assert_eq!(section.kind, NodeKind::SectionLevel1);
    }
    // The forced break sits between the second and third band
    assert!(page.children[0].bbox.y1() <= 496);
    assert!(page.children[1].bbox.y >= 488);
}

#[test]
fn test_full_hierarchy_and_line_counts() {
    init_logs();
    let input = working_scale_page();
    let analysis = analyze_page(input, &LayoutConfig::default(), None).unwrap();
    let page = &analysis.document;

    // Page -> SectionL1 -> ColumnL1 -> SectionL2 -> ColumnL2
    let mut columns = Vec::new();
    for section in &page.children {
        assert_eq!(section.children.len(), 1);
        let column1 = &section.children[0];
        assert_eq!(column1.kind, NodeKind::ColumnLevel1);
        assert_eq!(column1.children.len(), 1);
        let section2 = &column1.children[0];
        assert_eq!(section2.kind, NodeKind::SectionLevel2);
        assert_eq!(section2.children.len(), 1);
        let column2 = &section2.children[0];
        assert_eq!(column2.kind, NodeKind::ColumnLevel2);
        columns.push(column2);
    }

    // Uniform indents: one entry per column
    assert_eq!(columns[0].children.len(), 1);
    assert_eq!(columns[1].children.len(), 1);
    assert_eq!(columns[0].children[0].kind, NodeKind::Entry);

    // Bands A and B live in the first section, band C in the second
    assert_eq!(columns[0].children[0].children.len(), 22);
    assert_eq!(columns[1].children[0].children.len(), 10);

    // Lines come out top to bottom with increasing labels
    let lines = &columns[0].children[0].children;
    for pair in lines.windows(2) {
        assert!(pair[0].bbox.y < pair[1].bbox.y);
        assert!(pair[0].label < pair[1].label);
    }
    assert_eq!(lines[0].bbox.y, 100);
    assert_eq!(lines[0].bbox.y1(), 110);

    assert_containment(page);
}

#[test]
fn test_text_lands_on_the_first_line() {
    let input = working_scale_page();
    let analysis = analyze_page(input, &LayoutConfig::default(), None).unwrap();

    let mut first_line_text = None;
    analysis.document.walk(&mut |n| {
        if n.kind == NodeKind::Line && n.bbox.y == 100 && first_line_text.is_none() {
            first_line_text = Some(n.text.clone());
        }
    });
    assert_eq!(first_line_text.as_deref(), Some("alpha beta"));
}

#[test]
fn test_labels_cover_lines_without_sentinels() {
    let input = working_scale_page();
    let analysis = analyze_page(input, &LayoutConfig::default(), None).unwrap();

    // Label image is at input resolution and carries no negative values
    assert_eq!(analysis.labels.dimensions(), (1024, 800));
    for px in analysis.labels.pixels() {
        assert!(px.0[0] >= 0);
    }
    // The first strip's pixels carry the first line's label
    let lbl = analysis.labels.get_pixel(500, 105).0[0];
    assert!(lbl > 0);
}

#[test]
fn test_full_resolution_page_is_rescaled() {
    // The same page at scan resolution (2048 wide): the pipeline subsamples
    // by two, segments at the working scale, and rescales the tree back
    let mut img = GrayImage::from_pixel(2048, 1600, Luma([255]));
    draw_band(&mut img, 240, 1560, 200, 11, 20, 36);
    draw_band(&mut img, 240, 1560, 596, 11, 20, 36);
    draw_band(&mut img, 240, 1560, 992, 10, 20, 36);

    let input = PageInput {
        image: img,
        segments: vec![horizontal_rule(400, 1400, 988)],
        texts: Vec::new(),
    };
    let analysis = analyze_page(input, &LayoutConfig::default(), None).unwrap();
    let page = &analysis.document;

    assert_eq!(page.children.len(), 2);
    // Coordinates are back at scan resolution
    assert_eq!(page.bbox.x, 240);
    assert_eq!(page.bbox.y, 200);
    assert_eq!(page.children[0].bbox.y, 200);
    assert!(page.children[1].bbox.y >= 976);
    assert_eq!(analysis.labels.dimensions(), (2048, 1600));

    assert_containment(page);
}

#[test]
fn test_cancellation_from_another_thread() {
    // The cancel flag may be flipped from any thread; the pipeline stops at
    // the next stage boundary with no structural output
    use std::sync::Arc;

    let progress = Arc::new(Progress::new());
    let canceller = Arc::clone(&progress);
    std::thread::spawn(move || canceller.cancel())
        .join()
        .unwrap();

    let result = analyze_page(
        working_scale_page(),
        &LayoutConfig::default(),
        Some(progress.as_ref()),
    );
    assert!(matches!(result, Err(docstrata::Error::Canceled)));
}
