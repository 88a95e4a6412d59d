//! Priority-flood watershed transform.
//!
//! Floods a grayscale relief from pre-placed markers, lowest intensity
//! first. Ties within one intensity level are processed FIFO so that the
//! flood is deterministic for identical input. Pixels reached by a single
//! label adopt it; pixels where labels meet become permanent waterline
//! pixels (label 0).

use crate::LabelImage;
use image::GrayImage;
use std::collections::VecDeque;

/// Pixel never considered by the flood.
const UNLABELED: i32 = -2;
/// Pixel waiting in the queue.
const IN_QUEUE: i32 = -1;
/// Waterline / background label.
const WATERLINE: i32 = 0;

/// Bucket priority queue over 8-bit intensity levels with FIFO ordering
/// inside each level.
///
/// Pops are non-decreasing by level as long as pushes at levels below the
/// current one do not occur; the watershed flood only pushes neighbors at
/// their own intensity, which may sit below the current level, so the queue
/// rewinds its cursor on such pushes to keep the minimum property exact.
struct LevelQueue {
    buckets: Vec<VecDeque<(u32, u32)>>,
    current: usize,
    len: usize,
}

impl LevelQueue {
    fn new() -> Self {
        Self {
            buckets: (0..256).map(|_| VecDeque::new()).collect(),
            current: 0,
            len: 0,
        }
    }

    fn push(&mut self, level: u8, p: (u32, u32)) {
        let level = level as usize;
        self.buckets[level].push_back(p);
        if level < self.current {
            self.current = level;
        }
        self.len += 1;
    }

    fn pop(&mut self) -> Option<(u8, (u32, u32))> {
        if self.len == 0 {
            return None;
        }
        while self.buckets[self.current].is_empty() {
            self.current += 1;
        }
        let p = self.buckets[self.current].pop_front().expect("bucket not empty");
        self.len -= 1;
        Some((self.current as u8, p))
    }
}

fn neighbors4(x: u32, y: u32, w: u32, h: u32) -> impl Iterator<Item = (u32, u32)> {
    let mut out = [(0u32, 0u32); 4];
    let mut n = 0;
    if x > 0 {
        out[n] = (x - 1, y);
        n += 1;
    }
    if x + 1 < w {
        out[n] = (x + 1, y);
        n += 1;
    }
    if y > 0 {
        out[n] = (x, y - 1);
        n += 1;
    }
    if y + 1 < h {
        out[n] = (x, y + 1);
        n += 1;
    }
    out.into_iter().take(n)
}

/// Flood `input` from the markers in `labels` (4-connectivity).
///
/// On entry `labels` holds positive marker labels on seed pixels and zero
/// everywhere else. On return every pixel carries either a marker label or
/// the waterline label 0; no internal sentinel survives.
pub fn watershed(input: &GrayImage, labels: &mut LabelImage) {
    assert_eq!(input.dimensions(), labels.dimensions());
    let (w, h) = input.dimensions();

    let mut queue = LevelQueue::new();

    // Seed the queue with the unmarked pixels adjacent to a marker; every
    // other unmarked pixel starts unlabeled
    for y in 0..h {
        for x in 0..w {
            if labels.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            let near_marker = neighbors4(x, y, w, h).any(|(nx, ny)| labels.get_pixel(nx, ny).0[0] > 0);
            if near_marker {
                labels.put_pixel(x, y, image::Luma([IN_QUEUE]));
                queue.push(input.get_pixel(x, y).0[0], (x, y));
            } else {
                labels.put_pixel(x, y, image::Luma([UNLABELED]));
            }
        }
    }

    // Flood from the minima, lowest level first
    while let Some((_, (x, y))) = queue.pop() {
        debug_assert_eq!(labels.get_pixel(x, y).0[0], IN_QUEUE);

        // The pixel adopts the label of its marked neighbors if they all
        // agree; a disagreement makes it a permanent waterline pixel
        let mut common = WATERLINE;
        let mut single = false;
        for (nx, ny) in neighbors4(x, y, w, h) {
            let lbl = labels.get_pixel(nx, ny).0[0];
            if lbl <= 0 {
                continue;
            }
            if common == WATERLINE {
                common = lbl;
                single = true;
            } else if lbl != common {
                single = false;
                break;
            }
        }

        if !single {
            labels.put_pixel(x, y, image::Luma([WATERLINE]));
            continue;
        }

        labels.put_pixel(x, y, image::Luma([common]));
        for (nx, ny) in neighbors4(x, y, w, h) {
            if labels.get_pixel(nx, ny).0[0] == UNLABELED {
                labels.put_pixel(nx, ny, image::Luma([IN_QUEUE]));
                queue.push(input.get_pixel(nx, ny).0[0], (nx, ny));
            }
        }
    }

    // Pixels never reached stay waterline
    for px in labels.pixels_mut() {
        if px.0[0] < 0 {
            px.0[0] = WATERLINE;
        }
    }
}
