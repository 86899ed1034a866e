//! Production rendering backend: a tiny-skia pixmap.
//!
//! Everything is pure Rust and statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Surface, fills, paths | `tiny_skia` (via `resvg::tiny_skia`) |
//! | Border patterns | [`pattern::draw_pattern`](super::pattern::draw_pattern) |
//! | Grain | [`grain::apply_grain`](super::grain::apply_grain), seeded `StdRng` |
//! | Crop + scale | `image::imageops::crop_imm` + `resize` (`Triangle`) |
//! | Filters | [`FilterChain::apply`](super::filters::FilterChain::apply) |
//! | Polaroid shadow | `image::imageops::blur` on an alpha mask |
//! | Text | `usvg` + `resvg` |
//! | Encode → PNG | `image::codecs::png` |

use super::backend::{BackendError, DrawSurface, RenderBackend};
use super::grain;
use super::layout::Crop;
use super::params::{
    Color, Decoration, DrawImageParams, GrainParams, OUTLINE_COLOR, OUTLINE_WIDTH, SHADOW_BLUR,
    SHADOW_COLOR, SHADOW_OFFSET, TextParams,
};
use super::pattern;
use super::text;
use crate::types::BorderPattern;
use image::imageops::FilterType as ResizeFilter;
use image::{ImageFormat, Rgba, RgbaImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use resvg::tiny_skia::{
    self, ColorU8, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};
use std::io::Cursor;

/// Pure Rust backend drawing into tiny-skia pixmaps.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkiaBackend;

impl SkiaBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RenderBackend for SkiaBackend {
    type Surface = SkiaSurface;

    fn create_surface(&self, width: u32, height: u32) -> Result<SkiaSurface, BackendError> {
        let pixmap =
            Pixmap::new(width, height).ok_or(BackendError::Allocation { width, height })?;
        Ok(SkiaSurface { pixmap })
    }
}

pub struct SkiaSurface {
    pixmap: Pixmap,
}

impl SkiaSurface {
    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Un-premultiplied copy of the canvas.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let data: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        RgbaImage::from_raw(self.pixmap.width(), self.pixmap.height(), data)
            .unwrap_or_else(|| RgbaImage::new(self.pixmap.width(), self.pixmap.height()))
    }
}

fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.alpha_u8())
}

/// Premultiply an RGBA buffer into a pixmap of the same size.
fn rgba_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let data: Vec<u8> = image
        .pixels()
        .flat_map(|Rgba([r, g, b, a])| {
            let p = ColorU8::from_rgba(*r, *g, *b, *a).premultiply();
            [p.red(), p.green(), p.blue(), p.alpha()]
        })
        .collect();
    Pixmap::from_vec(data, size)
}

fn crop_source(image: &RgbaImage, crop: Crop) -> RgbaImage {
    match crop {
        Crop::Full => image.clone(),
        Crop::CenterSquare => {
            let (x, y, side) = super::layout::center_square(image.width(), image.height());
            image::imageops::crop_imm(image, x, y, side, side).to_image()
        }
    }
}

/// Blurred rectangular shadow the size of the photo, padded for the blur.
fn shadow_mask(width: u32, height: u32) -> (RgbaImage, u32) {
    let pad = SHADOW_BLUR.ceil() as u32 * 2;
    let alpha = SHADOW_COLOR.alpha_u8();
    let mut mask = RgbaImage::new(width + pad * 2, height + pad * 2);
    for y in pad..pad + height {
        for x in pad..pad + width {
            mask.put_pixel(x, y, Rgba([SHADOW_COLOR.r, SHADOW_COLOR.g, SHADOW_COLOR.b, alpha]));
        }
    }
    // Canvas shadowBlur is twice the Gaussian sigma.
    (image::imageops::blur(&mask, SHADOW_BLUR / 2.0), pad)
}

impl SkiaSurface {
    fn draw_shadow(&mut self, x: i32, y: i32, width: u32, height: u32) {
        let (mask, pad) = shadow_mask(width, height);
        if let Some(shadow) = rgba_to_pixmap(&mask) {
            self.pixmap.draw_pixmap(
                x + SHADOW_OFFSET.0 as i32 - pad as i32,
                y + SHADOW_OFFSET.1 as i32 - pad as i32,
                shadow.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
    }

    fn draw_outline(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let Some(rect) = Rect::from_xywh(x, y, width, height) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let mut paint = Paint::default();
        paint.set_color(to_skia_color(OUTLINE_COLOR));
        paint.anti_alias = true;
        let stroke = Stroke {
            width: OUTLINE_WIDTH,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

impl DrawSurface for SkiaSurface {
    fn width(&self) -> u32 {
        self.pixmap.width()
    }

    fn height(&self) -> u32 {
        self.pixmap.height()
    }

    fn fill(&mut self, color: Color) {
        self.pixmap.fill(to_skia_color(color));
    }

    fn draw_pattern(&mut self, kind: BorderPattern) {
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        pattern::draw_pattern(&mut self.pixmap, w, h, kind);
    }

    fn apply_grain(&mut self, params: &GrainParams) {
        let (w, h) = (self.pixmap.width(), self.pixmap.height());
        let mut rng = StdRng::seed_from_u64(params.seed);
        grain::apply_grain(&mut self.pixmap, w, h, params.intensity as f32, &mut rng);
    }

    fn draw_image(&mut self, params: &DrawImageParams<'_>) -> Result<(), BackendError> {
        let placement = params.placement;
        let (x, y, width, height) = placement.pixel_rect();
        if width == 0 || height == 0 || params.image.width() == 0 || params.image.height() == 0 {
            return Ok(());
        }

        let cropped = crop_source(params.image, placement.crop);
        let scaled = image::imageops::resize(&cropped, width, height, ResizeFilter::Triangle);
        let filtered = params.filters.apply(&scaled);
        let photo = rgba_to_pixmap(&filtered).ok_or_else(|| {
            BackendError::Layer(format!("cannot allocate {width}x{height}"))
        })?;

        if params.decoration == Decoration::DropShadow {
            self.draw_shadow(x, y, width, height);
        }
        self.pixmap.draw_pixmap(
            x,
            y,
            photo.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        if params.decoration == Decoration::Outline {
            self.draw_outline(placement.x, placement.y, placement.width, placement.height);
        }
        Ok(())
    }

    fn draw_text(&mut self, params: &TextParams) -> Result<(), BackendError> {
        text::render_text(&mut self.pixmap, params)
    }

    fn encode_png(&self) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        self.to_rgba_image()
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| BackendError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::filters::{FilterChain, FilterOp};
    use crate::imaging::layout::Placement;
    use crate::imaging::params::PAPER;

    fn placement(x: f32, y: f32, w: f32, h: f32, crop: Crop) -> Placement {
        Placement {
            x,
            y,
            width: w,
            height: h,
            crop,
        }
    }

    fn paper_surface(w: u32, h: u32) -> SkiaSurface {
        let mut surface = SkiaBackend::new().create_surface(w, h).unwrap();
        surface.fill(PAPER);
        surface
    }

    #[test]
    fn zero_sized_surface_is_an_allocation_error() {
        let err = SkiaBackend::new().create_surface(0, 10).err().unwrap();
        assert!(matches!(err, BackendError::Allocation { width: 0, height: 10 }));
    }

    #[test]
    fn fill_paints_every_pixel() {
        let surface = paper_surface(8, 8);
        let img = surface.to_rgba_image();
        assert!(img.pixels().all(|p| p.0 == [0xff, 0xfd, 0xf9, 255]));
    }

    #[test]
    fn image_lands_in_its_pixel_rect() {
        let mut surface = paper_surface(100, 100);
        let red = RgbaImage::from_pixel(40, 20, Rgba([255, 0, 0, 255]));
        let chain = FilterChain::default();
        surface
            .draw_image(&DrawImageParams {
                image: &red,
                placement: placement(30.0, 30.0, 40.0, 40.0, Crop::Full),
                filters: &chain,
                decoration: Decoration::None,
            })
            .unwrap();

        let img = surface.to_rgba_image();
        assert_eq!(img.get_pixel(30, 30).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(69, 69).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(29, 29).0, [0xff, 0xfd, 0xf9, 255]);
        assert_eq!(img.get_pixel(70, 50).0, [0xff, 0xfd, 0xf9, 255]);
    }

    #[test]
    fn center_square_crop_drops_the_sides() {
        let mut source = RgbaImage::from_pixel(30, 10, Rgba([0, 0, 255, 255]));
        for y in 0..10 {
            for x in 10..20 {
                source.put_pixel(x, y, Rgba([0, 255, 0, 255]));
            }
        }
        let mut surface = paper_surface(20, 20);
        let chain = FilterChain::default();
        surface
            .draw_image(&DrawImageParams {
                image: &source,
                placement: placement(0.0, 0.0, 20.0, 20.0, Crop::CenterSquare),
                filters: &chain,
                decoration: Decoration::None,
            })
            .unwrap();
        let img = surface.to_rgba_image();
        assert_eq!(img.get_pixel(0, 0).0, [0, 255, 0, 255]);
        assert_eq!(img.get_pixel(19, 19).0, [0, 255, 0, 255]);
    }

    #[test]
    fn filters_apply_to_the_photo_only() {
        let mut surface = paper_surface(20, 10);
        let white = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255]));
        let chain = FilterChain::new(vec![FilterOp::Brightness(0.5)]);
        surface
            .draw_image(&DrawImageParams {
                image: &white,
                placement: placement(0.0, 0.0, 10.0, 10.0, Crop::Full),
                filters: &chain,
                decoration: Decoration::None,
            })
            .unwrap();
        let img = surface.to_rgba_image();
        assert_eq!(img.get_pixel(5, 5).0, [128, 128, 128, 255]);
        assert_eq!(img.get_pixel(15, 5).0, [0xff, 0xfd, 0xf9, 255]);
    }

    #[test]
    fn drop_shadow_darkens_below_right() {
        let mut surface = paper_surface(80, 80);
        let white = RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
        let chain = FilterChain::default();
        surface
            .draw_image(&DrawImageParams {
                image: &white,
                placement: placement(20.0, 20.0, 40.0, 40.0, Crop::Full),
                filters: &chain,
                decoration: Decoration::DropShadow,
            })
            .unwrap();
        let img = surface.to_rgba_image();
        let under = img.get_pixel(61, 40).0;
        let far = img.get_pixel(2, 2).0;
        assert!(under[0] < far[0], "shadow should darken next to the photo");
        assert_eq!(far, [0xff, 0xfd, 0xf9, 255]);
    }

    #[test]
    fn outline_is_a_faint_hairline() {
        let mut surface = paper_surface(40, 40);
        let white = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        let chain = FilterChain::default();
        surface
            .draw_image(&DrawImageParams {
                image: &white,
                placement: placement(10.0, 10.0, 20.0, 20.0, Crop::Full),
                filters: &chain,
                decoration: Decoration::Outline,
            })
            .unwrap();
        let img = surface.to_rgba_image();
        let edge = img.get_pixel(10, 20).0;
        assert!(edge[0] < 255 && edge[0] > 230, "edge {edge:?}");
        assert_eq!(img.get_pixel(20, 20).0, [255, 255, 255, 255]);
    }

    #[test]
    fn encodes_a_decodable_png() {
        let surface = paper_surface(12, 7);
        let png = surface.encode_png().unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (12, 7));
        assert_eq!(decoded.get_pixel(3, 3).0, [0xff, 0xfd, 0xf9, 255]);
    }

    #[test]
    fn same_grain_seed_same_pixels() {
        let mut a = paper_surface(64, 64);
        let mut b = paper_surface(64, 64);
        let params = GrainParams {
            intensity: 25,
            seed: 11,
        };
        a.apply_grain(&params);
        b.apply_grain(&params);
        assert_eq!(a.pixmap().data(), b.pixmap().data());
    }
}
