//! Film grain: a random 100×100 noise tile repeated over the canvas with the
//! overlay blend mode.
//!
//! Tile pixels are grey with value `round((u − 0.5) · 255 · intensity / 100)`
//! for uniform `u ∈ [0, 1)`, clamped into `0..=255`, at alpha 40. Negative
//! values clamp to black, so low intensities mostly darken slightly; that is
//! the "paper" look the compositor lays down at intensity 5.

use rand::Rng;
use resvg::tiny_skia::{
    BlendMode, ColorU8, FilterQuality, Paint, Pattern, Pixmap, Rect, SpreadMode, Transform,
};

pub const GRAIN_TILE_SIZE: u32 = 100;
pub const GRAIN_ALPHA: u8 = 40;
/// Intensity of the paper texture laid over every render.
pub const PAPER_GRAIN: u8 = 5;

fn grain_value(u: f32, intensity: f32) -> u8 {
    ((u - 0.5) * 255.0 * (intensity / 100.0))
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Build one noise tile.
pub fn grain_tile<R: Rng + ?Sized>(intensity: f32, rng: &mut R) -> Option<Pixmap> {
    let mut tile = Pixmap::new(GRAIN_TILE_SIZE, GRAIN_TILE_SIZE)?;
    for px in tile.pixels_mut() {
        let v = grain_value(rng.random::<f32>(), intensity);
        *px = ColorU8::from_rgba(v, v, v, GRAIN_ALPHA).premultiply();
    }
    Some(tile)
}

/// Overlay a fresh grain tile across `width`×`height` of `pixmap`.
pub fn apply_grain<R: Rng + ?Sized>(
    pixmap: &mut Pixmap,
    width: u32,
    height: u32,
    intensity: f32,
    rng: &mut R,
) {
    let Some(tile) = grain_tile(intensity, rng) else {
        return;
    };
    let Some(rect) = Rect::from_xywh(0.0, 0.0, width as f32, height as f32) else {
        return;
    };
    let paint = Paint {
        shader: Pattern::new(
            tile.as_ref(),
            SpreadMode::Repeat,
            FilterQuality::Nearest,
            1.0,
            Transform::identity(),
        ),
        blend_mode: BlendMode::Overlay,
        ..Paint::default()
    };
    pixmap.fill_rect(rect, &paint, Transform::identity(), None);
}
