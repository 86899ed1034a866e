//! Shared value types used by the compositor, the store, and the CLI.
//!
//! Every enum here is a closed set. The string forms (`as_str`) are the same
//! snake_case names used in the JSON photo records, so a record written by one
//! version of the booth reads back unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parse a snake_case name against a closed set of variants.
fn parse_named<T: Copy>(value: &str, all: &[T], name: impl Fn(T) -> &'static str) -> Result<T, String> {
    let wanted = value.trim().to_ascii_lowercase().replace('-', "_");
    all.iter()
        .copied()
        .find(|v| name(*v) == wanted)
        .ok_or_else(|| {
            let names: Vec<&str> = all.iter().map(|v| name(*v)).collect();
            format!("unknown value '{value}', expected one of: {}", names.join(", "))
        })
}

/// Named stylistic filter layered on top of the numeric adjustments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    #[default]
    Normal,
    Grayscale,
    Sepia,
    Warm,
    Cool,
    Vintage,
}

impl FilterType {
    pub const ALL: [FilterType; 6] = [
        FilterType::Normal,
        FilterType::Grayscale,
        FilterType::Sepia,
        FilterType::Warm,
        FilterType::Cool,
        FilterType::Vintage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::Normal => "normal",
            FilterType::Grayscale => "grayscale",
            FilterType::Sepia => "sepia",
            FilterType::Warm => "warm",
            FilterType::Cool => "cool",
            FilterType::Vintage => "vintage",
        }
    }
}

/// Layout rule governing canvas shape and image placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    #[default]
    None,
    Polaroid,
    Strip,
    SquareFrame,
}

impl TemplateType {
    pub const ALL: [TemplateType; 4] = [
        TemplateType::None,
        TemplateType::Polaroid,
        TemplateType::Strip,
        TemplateType::SquareFrame,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TemplateType::None => "none",
            TemplateType::Polaroid => "polaroid",
            TemplateType::Strip => "strip",
            TemplateType::SquareFrame => "square_frame",
        }
    }

    /// Template the editor starts with for a batch of `image_count` shots.
    pub fn default_for(image_count: usize) -> Self {
        if image_count > 1 {
            TemplateType::Strip
        } else {
            TemplateType::Polaroid
        }
    }
}

/// Decorative motif tiled beneath the photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderPattern {
    #[default]
    None,
    Hearts,
    Stars,
    Dots,
    Checker,
    Striped,
    Floral,
}

impl BorderPattern {
    pub const ALL: [BorderPattern; 7] = [
        BorderPattern::None,
        BorderPattern::Hearts,
        BorderPattern::Stars,
        BorderPattern::Dots,
        BorderPattern::Checker,
        BorderPattern::Striped,
        BorderPattern::Floral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BorderPattern::None => "none",
            BorderPattern::Hearts => "hearts",
            BorderPattern::Stars => "stars",
            BorderPattern::Dots => "dots",
            BorderPattern::Checker => "checker",
            BorderPattern::Striped => "striped",
            BorderPattern::Floral => "floral",
        }
    }
}

/// Named AI re-render style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiPreset {
    #[default]
    None,
    Glow,
    Bollywood,
    RetroAnime,
    VintageNoir,
    Cyber,
}

impl AiPreset {
    pub const ALL: [AiPreset; 6] = [
        AiPreset::None,
        AiPreset::Glow,
        AiPreset::Bollywood,
        AiPreset::RetroAnime,
        AiPreset::VintageNoir,
        AiPreset::Cyber,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AiPreset::None => "none",
            AiPreset::Glow => "glow",
            AiPreset::Bollywood => "bollywood",
            AiPreset::RetroAnime => "retro_anime",
            AiPreset::VintageNoir => "vintage_noir",
            AiPreset::Cyber => "cyber",
        }
    }
}

macro_rules! named_enum_traits {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_named(s, &<$ty>::ALL, <$ty>::as_str)
            }
        }
    )*};
}

named_enum_traits!(FilterType, TemplateType, BorderPattern, AiPreset);

/// Number of shots taken in one booth session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CaptureMode {
    #[default]
    Single,
    Triple,
    Quad,
}

impl CaptureMode {
    pub fn shots(self) -> usize {
        match self {
            CaptureMode::Single => 1,
            CaptureMode::Triple => 3,
            CaptureMode::Quad => 4,
        }
    }
}

impl TryFrom<u8> for CaptureMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CaptureMode::Single),
            3 => Ok(CaptureMode::Triple),
            4 => Ok(CaptureMode::Quad),
            other => Err(format!("capture mode must be 1, 3 or 4 shots, got {other}")),
        }
    }
}

impl From<CaptureMode> for u8 {
    fn from(mode: CaptureMode) -> Self {
        mode.shots() as u8
    }
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: u8 = s.trim().parse().map_err(|_| format!("not a shot count: {s}"))?;
        CaptureMode::try_from(n)
    }
}

/// Numeric adjustments plus the named filter.
///
/// Ranges: brightness and contrast `-50..=50`, blur `0..=5` px, grain
/// `0..=50`. [`FilterSettings::new`] and [`FilterSettings::clamped`] pull
/// out-of-range values back in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub brightness: i32,
    pub contrast: i32,
    pub blur: i32,
    pub grain: i32,
    #[serde(rename = "type")]
    pub filter_type: FilterType,
}

impl FilterSettings {
    pub const BRIGHTNESS_RANGE: (i32, i32) = (-50, 50);
    pub const CONTRAST_RANGE: (i32, i32) = (-50, 50);
    pub const BLUR_RANGE: (i32, i32) = (0, 5);
    pub const GRAIN_RANGE: (i32, i32) = (0, 50);

    pub fn new(brightness: i32, contrast: i32, blur: i32, grain: i32, filter_type: FilterType) -> Self {
        Self {
            brightness,
            contrast,
            blur,
            grain,
            filter_type,
        }
        .clamped()
    }

    pub fn clamped(self) -> Self {
        let clamp = |v: i32, (lo, hi): (i32, i32)| v.clamp(lo, hi);
        Self {
            brightness: clamp(self.brightness, Self::BRIGHTNESS_RANGE),
            contrast: clamp(self.contrast, Self::CONTRAST_RANGE),
            blur: clamp(self.blur, Self::BLUR_RANGE),
            grain: clamp(self.grain, Self::GRAIN_RANGE),
            filter_type: self.filter_type,
        }
    }
}
