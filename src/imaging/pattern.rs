//! Procedural border patterns painted beneath the photos.
//!
//! Each motif tiles the full canvas on a fixed grid. Staggered motifs shift
//! every odd row right by half the spacing.
//!
//! | Pattern | Colour | Grid | Motif |
//! |---|---|---|---|
//! | dots | `#fce7f3` | 40 | r6 circle at cell+20, even-parity cells only |
//! | checker | `#fff1f2` | 60 | filled square, even-parity cells only |
//! | hearts | `#fecdd3` | 60 | 10px bezier heart, stagger 30 |
//! | stars | `#fef08a` | 80 | 5-point star r8/r4 at cell+10, stagger 40 |
//! | striped | `#fbcfe8` | 40 | 20px diagonal lines `(i,0)→(i+h,h)` |
//! | floral | `#fda4af` / `#fef08a` | 70 | 5 r8 petals + r5.6 centre at cell+15, stagger 35 |

use crate::types::BorderPattern;
use resvg::tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform};
use std::f32::consts::PI;

const DOTS_COLOR: [u8; 3] = [0xfc, 0xe7, 0xf3];
const CHECKER_COLOR: [u8; 3] = [0xff, 0xf1, 0xf2];
const HEART_COLOR: [u8; 3] = [0xfe, 0xcd, 0xd3];
const STAR_COLOR: [u8; 3] = [0xfe, 0xf0, 0x8a];
const STRIPE_COLOR: [u8; 3] = [0xfb, 0xcf, 0xe8];
const PETAL_COLOR: [u8; 3] = [0xfd, 0xa4, 0xaf];
const FLOWER_CENTER_COLOR: [u8; 3] = [0xfe, 0xf0, 0x8a];

const DOT_SPACING: u32 = 40;
const DOT_RADIUS: f32 = 6.0;
const CHECKER_SIZE: u32 = 60;
const HEART_SPACING: u32 = 60;
const HEART_SIZE: f32 = 10.0;
const STAR_SPACING: u32 = 80;
const STAR_SPIKES: usize = 5;
const STAR_OUTER: f32 = 8.0;
const STAR_INNER: f32 = 4.0;
const STRIPE_WIDTH: f32 = 20.0;
const STRIPE_STEP: usize = 40;
const FLOWER_SPACING: u32 = 70;
const PETAL_RADIUS: f32 = 8.0;

/// Paint `kind` over the whole `width`×`height` area of `pixmap`.
pub fn draw_pattern(pixmap: &mut Pixmap, width: u32, height: u32, kind: BorderPattern) {
    match kind {
        BorderPattern::None => {}
        BorderPattern::Dots => draw_dots(pixmap, width, height),
        BorderPattern::Checker => draw_checker(pixmap, width, height),
        BorderPattern::Hearts => draw_hearts(pixmap, width, height),
        BorderPattern::Stars => draw_stars(pixmap, width, height),
        BorderPattern::Striped => draw_stripes(pixmap, width, height),
        BorderPattern::Floral => draw_flowers(pixmap, width, height),
    }
}

fn solid(rgb: [u8; 3]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgb[0], rgb[1], rgb[2], 255);
    paint.anti_alias = true;
    paint
}

/// Top-left corners of every grid cell, with the cell's row and column index.
fn grid(width: u32, height: u32, spacing: u32) -> impl Iterator<Item = (u32, u32, f32, f32)> {
    let cols = width.div_ceil(spacing);
    let rows = height.div_ceil(spacing);
    (0..cols).flat_map(move |col| {
        (0..rows).map(move |row| (col, row, (col * spacing) as f32, (row * spacing) as f32))
    })
}

fn stagger(row: u32, spacing: u32) -> f32 {
    (row % 2) as f32 * spacing as f32 / 2.0
}

fn fill(pixmap: &mut Pixmap, path: &Path, paint: &Paint) {
    pixmap.fill_path(path, paint, FillRule::Winding, Transform::identity(), None);
}

fn draw_dots(pixmap: &mut Pixmap, width: u32, height: u32) {
    let paint = solid(DOTS_COLOR);
    let offset = DOT_SPACING as f32 / 2.0;
    let mut pb = PathBuilder::new();
    for (col, row, x, y) in grid(width, height, DOT_SPACING) {
        if (col + row) % 2 == 0 {
            pb.push_circle(x + offset, y + offset, DOT_RADIUS);
        }
    }
    if let Some(path) = pb.finish() {
        fill(pixmap, &path, &paint);
    }
}

fn draw_checker(pixmap: &mut Pixmap, width: u32, height: u32) {
    let paint = solid(CHECKER_COLOR);
    let size = CHECKER_SIZE as f32;
    for (col, row, x, y) in grid(width, height, CHECKER_SIZE) {
        if (col + row) % 2 != 0 {
            continue;
        }
        if let Some(rect) = Rect::from_xywh(x, y, size, size) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
}

/// Heart with its top notch at `(x, y)`, pointing down to `(x, y + size)`.
fn push_heart(pb: &mut PathBuilder, x: f32, y: f32, size: f32) {
    pb.move_to(x, y);
    pb.cubic_to(
        x - size / 2.0,
        y - size / 2.0,
        x - size,
        y + size / 3.0,
        x,
        y + size,
    );
    pb.cubic_to(
        x + size,
        y + size / 3.0,
        x + size / 2.0,
        y - size / 2.0,
        x,
        y,
    );
    pb.close();
}

fn draw_hearts(pixmap: &mut Pixmap, width: u32, height: u32) {
    let paint = solid(HEART_COLOR);
    let mut pb = PathBuilder::new();
    for (_, row, x, y) in grid(width, height, HEART_SPACING) {
        push_heart(&mut pb, x + stagger(row, HEART_SPACING), y, HEART_SIZE);
    }
    if let Some(path) = pb.finish() {
        fill(pixmap, &path, &paint);
    }
}

fn push_star(pb: &mut PathBuilder, cx: f32, cy: f32) {
    let step = PI / STAR_SPIKES as f32;
    let mut rot = PI / 2.0 * 3.0;
    pb.move_to(cx, cy - STAR_OUTER);
    for _ in 0..STAR_SPIKES {
        pb.line_to(cx + rot.cos() * STAR_OUTER, cy + rot.sin() * STAR_OUTER);
        rot += step;
        pb.line_to(cx + rot.cos() * STAR_INNER, cy + rot.sin() * STAR_INNER);
        rot += step;
    }
    pb.line_to(cx, cy - STAR_OUTER);
    pb.close();
}

fn draw_stars(pixmap: &mut Pixmap, width: u32, height: u32) {
    let paint = solid(STAR_COLOR);
    let mut pb = PathBuilder::new();
    for (_, row, x, y) in grid(width, height, STAR_SPACING) {
        push_star(&mut pb, x + stagger(row, STAR_SPACING) + 10.0, y + 10.0);
    }
    if let Some(path) = pb.finish() {
        fill(pixmap, &path, &paint);
    }
}

fn draw_stripes(pixmap: &mut Pixmap, width: u32, height: u32) {
    let paint = solid(STRIPE_COLOR);
    let stroke = Stroke {
        width: STRIPE_WIDTH,
        ..Stroke::default()
    };
    let (w, h) = (width as i64, height as i64);
    let mut pb = PathBuilder::new();
    for i in (-h..w).step_by(STRIPE_STEP) {
        pb.move_to(i as f32, 0.0);
        pb.line_to((i + h) as f32, h as f32);
    }
    if let Some(path) = pb.finish() {
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

fn draw_flowers(pixmap: &mut Pixmap, width: u32, height: u32) {
    let mut petals = PathBuilder::new();
    let mut centers = PathBuilder::new();
    for (_, row, x, y) in grid(width, height, FLOWER_SPACING) {
        let cx = x + stagger(row, FLOWER_SPACING) + 15.0;
        let cy = y + 15.0;
        for i in 0..5 {
            let angle = PI * 2.0 / 5.0 * i as f32;
            petals.push_circle(
                cx + angle.cos() * PETAL_RADIUS,
                cy + angle.sin() * PETAL_RADIUS,
                PETAL_RADIUS,
            );
        }
        centers.push_circle(cx, cy, PETAL_RADIUS * 0.7);
    }
    // Centres go on top of every petal.
    if let Some(path) = petals.finish() {
        fill(pixmap, &path, &solid(PETAL_COLOR));
    }
    if let Some(path) = centers.finish() {
        fill(pixmap, &path, &solid(FLOWER_CENTER_COLOR));
    }
}
