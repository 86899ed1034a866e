//! The compositor: decoded photos + settings → one finished PNG.
//!
//! Drawing order is fixed:
//!
//! 1. canvas from [`compute_layout`]
//! 2. paper fill `#fffdf9`
//! 3. border pattern (unless `none`)
//! 4. paper grain at intensity 5
//! 5. photos through the filter chain, with polaroid shadow or strip outline
//! 6. user grain (only when > 0)
//! 7. polaroid caption: date + "blush booth memories"
//! 8. watermark, unless disabled or the template is polaroid or strip
//! 9. PNG encode
//!
//! [`compose`] never fails. Zero photos, an unallocatable canvas or an encode
//! error all resolve to [`ComposedOutput::empty`], logged at the point of
//! failure.

use super::backend::{BackendError, DrawSurface, RenderBackend};
use super::filters::build_filter_chain;
use super::grain::PAPER_GRAIN;
use super::layout::compute_layout;
use super::params::{
    Color, Decoration, DrawImageParams, GrainParams, PAPER, TextAnchor, TextParams, TextShadow,
};
use super::skia_backend::SkiaBackend;
use super::source::{SourceImage, png_data_uri};
use crate::types::{BorderPattern, FilterSettings, TemplateType};
use chrono::{Local, NaiveDate};
use rand::Rng;
use tracing::{debug, error, instrument};

pub const WATERMARK_TEXT: &str = "BlushBooth ✨";
pub const CAPTION_TAGLINE: &str = "blush booth memories";

/// Everything a render depends on besides the photos themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub settings: FilterSettings,
    pub template: TemplateType,
    pub border_pattern: BorderPattern,
    pub width: u32,
    pub height: u32,
    pub show_watermark: bool,
    /// Printed under a polaroid.
    pub date: NaiveDate,
    /// Fixes both grain passes. `None` draws fresh noise every render.
    pub grain_seed: Option<u64>,
}

impl RenderRequest {
    /// Request with the watermark on, today's date and fresh grain.
    pub fn new(
        settings: FilterSettings,
        template: TemplateType,
        border_pattern: BorderPattern,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            settings,
            template,
            border_pattern,
            width,
            height,
            show_watermark: true,
            date: Local::now().date_naive(),
            grain_seed: None,
        }
    }

    pub fn with_watermark(mut self, show: bool) -> Self {
        self.show_watermark = show;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn with_grain_seed(mut self, seed: u64) -> Self {
        self.grain_seed = Some(seed);
        self
    }

    /// Same request at a different output size.
    pub fn at_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// A finished render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComposedOutput {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl ComposedOutput {
    /// The fallback result: no canvas, no bytes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    /// `data:image/png;base64,…`, or an empty string for the fallback.
    pub fn to_data_uri(&self) -> String {
        if self.is_empty() {
            String::new()
        } else {
            png_data_uri(&self.png)
        }
    }
}

/// Polaroid caption: the date and the tagline, centred under the photo.
pub fn caption_lines(canvas_width: u32, canvas_height: u32, date: NaiveDate) -> [TextParams; 2] {
    let cx = canvas_width as f32 / 2.0;
    let h = canvas_height as f32;
    [
        TextParams {
            text: date.format("%b %-d, %Y").to_string(),
            x: cx,
            y: h - 50.0,
            size: 20.0,
            bold: true,
            color: Color::rgb(0x2c, 0x2c, 0x2c),
            anchor: TextAnchor::Middle,
            shadow: None,
        },
        TextParams {
            text: CAPTION_TAGLINE.to_string(),
            x: cx,
            y: h - 25.0,
            size: 12.0,
            bold: false,
            color: Color::rgb(0x88, 0x88, 0x88),
            anchor: TextAnchor::Middle,
            shadow: None,
        },
    ]
}

/// Bottom-right watermark with a soft dark shadow.
pub fn watermark_line(canvas_width: u32, canvas_height: u32) -> TextParams {
    TextParams {
        text: WATERMARK_TEXT.to_string(),
        x: canvas_width as f32 - 20.0,
        y: canvas_height as f32 - 20.0,
        size: 16.0,
        bold: true,
        color: Color::rgba(255, 255, 255, 0.8),
        anchor: TextAnchor::End,
        shadow: Some(TextShadow {
            color: Color::rgba(0, 0, 0, 0.5),
            blur: 4.0,
        }),
    }
}

fn shows_watermark(request: &RenderRequest) -> bool {
    request.show_watermark
        && !matches!(
            request.template,
            TemplateType::Polaroid | TemplateType::Strip
        )
}

fn decoration_for(template: TemplateType, image_count: usize) -> Decoration {
    match (template, image_count) {
        (TemplateType::Polaroid, 1) => Decoration::DropShadow,
        (TemplateType::Strip, n) if n > 1 => Decoration::Outline,
        _ => Decoration::None,
    }
}

/// Compose `sources` with the production backend.
pub fn compose(sources: &[SourceImage], request: &RenderRequest) -> ComposedOutput {
    compose_with(&SkiaBackend::new(), sources, request)
}

/// Compose `sources` on any backend. Failures are logged and yield
/// [`ComposedOutput::empty`].
#[instrument(skip_all, fields(
    images = sources.len(),
    template = %request.template,
    pattern = %request.border_pattern,
    width = request.width,
))]
pub fn compose_with<B: RenderBackend>(
    backend: &B,
    sources: &[SourceImage],
    request: &RenderRequest,
) -> ComposedOutput {
    if sources.is_empty() {
        debug!("no source images, returning empty output");
        return ComposedOutput::empty();
    }
    match render(backend, sources, request) {
        Ok(output) => {
            debug!(
                width = output.width,
                height = output.height,
                bytes = output.png.len(),
                "composed"
            );
            output
        }
        Err(e) => {
            error!(error = %e, "composition failed, returning empty output");
            ComposedOutput::empty()
        }
    }
}

fn render<B: RenderBackend>(
    backend: &B,
    sources: &[SourceImage],
    request: &RenderRequest,
) -> Result<ComposedOutput, BackendError> {
    let layout = compute_layout(sources.len(), request.template, request.width, request.height);
    let mut surface = backend.create_surface(layout.canvas_width, layout.canvas_height)?;
    let (width, height) = (surface.width(), surface.height());

    let seed = request.grain_seed.unwrap_or_else(|| rand::rng().random());

    surface.fill(PAPER);
    if request.border_pattern != BorderPattern::None {
        surface.draw_pattern(request.border_pattern);
    }
    surface.apply_grain(&GrainParams {
        intensity: PAPER_GRAIN,
        seed,
    });

    let settings = request.settings.clamped();
    let filters = build_filter_chain(&settings);
    let decoration = decoration_for(request.template, sources.len());
    for (source, placement) in sources.iter().zip(&layout.placements) {
        surface.draw_image(&DrawImageParams {
            image: source.image(),
            placement: *placement,
            filters: &filters,
            decoration,
        })?;
    }

    if settings.grain > 0 {
        surface.apply_grain(&GrainParams {
            intensity: settings.grain as u8,
            seed: seed.wrapping_add(1),
        });
    }

    if request.template == TemplateType::Polaroid {
        for line in caption_lines(width, height, request.date) {
            surface.draw_text(&line)?;
        }
    }
    if shows_watermark(request) {
        surface.draw_text(&watermark_line(width, height))?;
    }

    let png = surface.encode_png()?;
    Ok(ComposedOutput { width, height, png })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MOCK_PNG, MockBackend, RecordedOp};
    use crate::imaging::layout::Crop;
    use crate::test_helpers::solid_source;
    use crate::types::FilterType;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn request(template: TemplateType, pattern: BorderPattern, size: u32) -> RenderRequest {
        RenderRequest::new(FilterSettings::default(), template, pattern, size, size)
            .with_date(date())
            .with_grain_seed(7)
    }

    fn sources(n: usize) -> Vec<SourceImage> {
        (0..n).map(|i| solid_source(64, 48, [i as u8 * 40, 90, 200])).collect()
    }

    // =========================================================================
    // Drawing order
    // =========================================================================

    #[test]
    fn strip_draws_pattern_before_any_photo() {
        let backend = MockBackend::new();
        let out = compose_with(
            &backend,
            &sources(3),
            &request(TemplateType::Strip, BorderPattern::Hearts, 600),
        );
        assert_eq!((out.width, out.height), (600, 1740));

        let ops = backend.get_operations();
        assert_eq!(
            ops[0],
            RecordedOp::CreateSurface {
                width: 600,
                height: 1740
            }
        );
        assert_eq!(ops[1], RecordedOp::Fill(PAPER));
        assert_eq!(ops[2], RecordedOp::Pattern(BorderPattern::Hearts));
        assert!(matches!(ops[3], RecordedOp::Grain { intensity: 5, .. }));

        let first_image = ops.iter().position(RecordedOp::is_image).unwrap();
        assert!(first_image > 2);
        let images: Vec<_> = ops.iter().filter(|op| op.is_image()).collect();
        assert_eq!(images.len(), 3);
        for op in images {
            assert!(matches!(
                op,
                RecordedOp::Image {
                    crop: Crop::CenterSquare,
                    decoration: Decoration::Outline,
                    ..
                }
            ));
        }
        assert_eq!(ops.last(), Some(&RecordedOp::EncodePng));
    }

    #[test]
    fn no_pattern_op_for_none() {
        let backend = MockBackend::new();
        compose_with(
            &backend,
            &sources(1),
            &request(TemplateType::None, BorderPattern::None, 200),
        );
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Pattern(_)))
        );
    }

    #[test]
    fn zero_grain_means_a_single_grain_pass() {
        let backend = MockBackend::new();
        compose_with(
            &backend,
            &sources(1),
            &request(TemplateType::None, BorderPattern::None, 200),
        );
        let grains = backend.get_operations().iter().filter(|op| op.is_grain()).count();
        assert_eq!(grains, 1);
    }

    #[test]
    fn user_grain_comes_after_the_photos() {
        let backend = MockBackend::new();
        let mut req = request(TemplateType::None, BorderPattern::None, 200);
        req.settings = FilterSettings::new(0, 0, 0, 30, FilterType::Normal);
        compose_with(&backend, &sources(1), &req);

        let ops = backend.get_operations();
        let image_at = ops.iter().position(RecordedOp::is_image).unwrap();
        let grains: Vec<(usize, &RecordedOp)> =
            ops.iter().enumerate().filter(|(_, op)| op.is_grain()).collect();
        assert_eq!(grains.len(), 2);
        assert!(grains[0].0 < image_at);
        assert!(grains[1].0 > image_at);
        assert!(matches!(
            grains[1].1,
            RecordedOp::Grain {
                intensity: 30,
                seed: 8
            }
        ));
    }

    #[test]
    fn every_photo_gets_the_same_filter_chain() {
        let backend = MockBackend::new();
        let mut req = request(TemplateType::None, BorderPattern::None, 400);
        req.settings = FilterSettings::new(10, 0, 2, 0, FilterType::Sepia);
        compose_with(&backend, &sources(4), &req);

        let chains: Vec<String> = backend
            .get_operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Image { filters, .. } => Some(filters),
                _ => None,
            })
            .collect();
        assert_eq!(chains.len(), 4);
        assert!(chains.iter().all(|c| c == &chains[0]));
        assert!(chains[0].starts_with("brightness(110%)"));
        assert!(chains[0].ends_with("sepia(80%) contrast(90%)"));
    }

    // =========================================================================
    // Polaroid caption and watermark
    // =========================================================================

    #[test]
    fn polaroid_single_has_caption_and_no_watermark() {
        let backend = MockBackend::new();
        let out = compose_with(
            &backend,
            &sources(1),
            &request(TemplateType::Polaroid, BorderPattern::None, 280),
        );
        assert_eq!((out.width, out.height), (340, 460));

        let ops = backend.get_operations();
        let image = ops.iter().find(|op| op.is_image()).unwrap();
        assert_eq!(
            image,
            &RecordedOp::Image {
                x: 30.0,
                y: 30.0,
                width: 280.0,
                height: 280.0,
                crop: Crop::Full,
                decoration: Decoration::DropShadow,
                filters: build_filter_chain(&FilterSettings::default()).to_css(),
            }
        );

        let texts: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                RecordedOp::Text { text, x, y, .. } => Some((text.as_str(), *x, *y)),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts,
            vec![
                ("Mar 5, 2024", 170.0, 410.0),
                (CAPTION_TAGLINE, 170.0, 435.0)
            ]
        );
    }

    #[test]
    fn watermark_only_outside_polaroid_and_strip() {
        for (template, count, expected) in [
            (TemplateType::None, 1, true),
            (TemplateType::SquareFrame, 1, true),
            (TemplateType::Polaroid, 1, false),
            (TemplateType::Strip, 3, false),
            (TemplateType::None, 4, true),
        ] {
            let backend = MockBackend::new();
            compose_with(
                &backend,
                &sources(count),
                &request(template, BorderPattern::None, 300),
            );
            let has_watermark = backend.get_operations().iter().any(|op| {
                matches!(op, RecordedOp::Text { text, anchor: TextAnchor::End, .. } if text == WATERMARK_TEXT)
            });
            assert_eq!(has_watermark, expected, "{template} x{count}");
        }
    }

    #[test]
    fn watermark_can_be_turned_off() {
        let backend = MockBackend::new();
        let req = request(TemplateType::None, BorderPattern::None, 300).with_watermark(false);
        compose_with(&backend, &sources(1), &req);
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Text { .. }))
        );
    }

    #[test]
    fn watermark_sits_bottom_right() {
        let line = watermark_line(600, 400);
        assert_eq!((line.x, line.y), (580.0, 380.0));
        assert_eq!(line.anchor, TextAnchor::End);
        assert!(line.shadow.is_some());
    }

    #[test]
    fn caption_date_has_no_zero_padding() {
        let [date_line, tagline] = caption_lines(340, 460, date());
        assert_eq!(date_line.text, "Mar 5, 2024");
        assert!(date_line.bold);
        assert_eq!(tagline.size, 12.0);
        let christmas = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
        let [december, _] = caption_lines(340, 460, christmas);
        assert_eq!(december.text, "Dec 25, 2023");
    }

    // =========================================================================
    // Fallbacks
    // =========================================================================

    #[test]
    fn zero_images_never_touch_the_backend() {
        let backend = MockBackend::new();
        let req = request(TemplateType::Strip, BorderPattern::Dots, 600);
        let out = compose_with(&backend, &[], &req);
        assert_eq!(out, ComposedOutput::empty());
        assert_eq!(out.to_data_uri(), "");
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn allocation_failure_falls_back() {
        let backend = MockBackend::failing_allocation();
        let req = request(TemplateType::None, BorderPattern::None, 100);
        let out = compose_with(&backend, &sources(1), &req);
        assert!(out.is_empty());
    }

    #[test]
    fn encode_failure_falls_back() {
        let backend = MockBackend::failing_encode();
        let req = request(TemplateType::None, BorderPattern::None, 100);
        let out = compose_with(&backend, &sources(1), &req);
        assert!(out.is_empty());
    }

    #[test]
    fn data_uri_wraps_png_bytes() {
        let backend = MockBackend::new();
        let req = request(TemplateType::None, BorderPattern::None, 100);
        let out = compose_with(&backend, &sources(1), &req);
        assert_eq!(out.png, MOCK_PNG);
        assert!(out.to_data_uri().starts_with("data:image/png;base64,"));
    }

    // =========================================================================
    // Real pixels
    // =========================================================================

    #[test]
    fn fixed_seed_renders_identically() {
        let mut req = request(TemplateType::Polaroid, BorderPattern::Stars, 120);
        req.settings = FilterSettings::new(5, -5, 1, 20, FilterType::Warm);
        let a = compose(&sources(1), &req);
        let b = compose(&sources(1), &req);
        assert!(!a.is_empty());
        assert_eq!(a, b);
    }

    #[test]
    fn unseeded_renders_keep_their_geometry() {
        let req = RenderRequest::new(
            FilterSettings::default(),
            TemplateType::SquareFrame,
            BorderPattern::Checker,
            90,
            60,
        );
        let a = compose(&sources(1), &req);
        let b = compose(&sources(1), &req);
        assert_eq!((a.width, a.height), (190, 190));
        assert_eq!((a.width, a.height), (b.width, b.height));
    }
}
