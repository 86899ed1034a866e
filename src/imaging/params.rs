//! Parameter types for drawing operations.
//!
//! These structs describe *what* to draw, not *how* to draw it. They are the
//! interface between the [`compose`](super::compose) module (which decides
//! what goes where on the canvas) and the [`backend`](super::backend) (which
//! does the actual pixel work). The same separation lets tests swap in a
//! recording mock without changing composition logic.
//!
//! ## Types
//!
//! - [`Color`]: sRGB colour with a fractional opacity, like a CSS `rgba()`.
//! - [`Decoration`]: Extra treatment around a placed photo (shadow, outline).
//! - [`DrawImageParams`]: One photo: source pixels, placement, filter chain.
//! - [`GrainParams`]: Intensity plus the RNG seed for one grain pass.
//! - [`TextParams`]: One line of caption or watermark text.

use super::filters::FilterChain;
use super::layout::Placement;
use image::RgbaImage;

/// sRGB colour with an opacity in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f32,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self { r, g, b, alpha }
    }

    /// `#rrggbb`, without the opacity.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Opacity as an 8-bit alpha.
    pub fn alpha_u8(self) -> u8 {
        (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Off-white paper colour every render starts from.
pub const PAPER: Color = Color::rgb(0xff, 0xfd, 0xf9);

/// Treatment drawn around a photo in addition to its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decoration {
    #[default]
    None,
    /// Soft shadow under a polaroid print.
    DropShadow,
    /// Hairline frame around each strip photo.
    Outline,
}

/// Drop shadow under a single polaroid photo.
pub const SHADOW_COLOR: Color = Color::rgba(0, 0, 0, 0.1);
pub const SHADOW_BLUR: f32 = 10.0;
pub const SHADOW_OFFSET: (f32, f32) = (2.0, 2.0);

/// Hairline around each strip photo.
pub const OUTLINE_COLOR: Color = Color::rgba(0, 0, 0, 0.05);
pub const OUTLINE_WIDTH: f32 = 1.0;

/// Draw one source photo into its placement.
#[derive(Debug, Clone, Copy)]
pub struct DrawImageParams<'a> {
    pub image: &'a RgbaImage,
    pub placement: Placement,
    pub filters: &'a FilterChain,
    pub decoration: Decoration,
}

/// One grain pass. The seed makes the noise reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrainParams {
    pub intensity: u8,
    pub seed: u64,
}

/// Horizontal alignment of a text line relative to its `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAnchor {
    Middle,
    End,
}

impl TextAnchor {
    pub fn as_svg(self) -> &'static str {
        match self {
            TextAnchor::Middle => "middle",
            TextAnchor::End => "end",
        }
    }
}

/// Blurred shadow behind a text line. `blur` follows canvas `shadowBlur`
/// semantics, i.e. twice the Gaussian standard deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextShadow {
    pub color: Color,
    pub blur: f32,
}

/// One line of text. `y` is the alphabetic baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextParams {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
    pub color: Color,
    pub anchor: TextAnchor,
    pub shadow: Option<TextShadow>,
}
