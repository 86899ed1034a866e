//! Shared test utilities for the blushbooth test suite.
//!
//! Synthetic images (so no test depends on binary fixtures) and ready-made
//! photo records for store and studio tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let shot = solid_source(64, 48, [255, 0, 0]);
//! let record = sample_record("a", 1_700_000_000_000);
//! ```

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

use crate::imaging::SourceImage;
use crate::store::PhotoRecord;
use crate::types::{FilterType, TemplateType};

// =========================================================================
// Synthetic images
// =========================================================================

pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Opaque single-colour PNG.
pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(
        width,
        height,
        Rgba([rgb[0], rgb[1], rgb[2], 255]),
    ))
}

/// Black and white 1px checkerboard PNG.
pub fn checkerboard_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    }))
}

pub fn solid_source(width: u32, height: u32, rgb: [u8; 3]) -> SourceImage {
    SourceImage::from_rgba(RgbaImage::from_pixel(
        width,
        height,
        Rgba([rgb[0], rgb[1], rgb[2], 255]),
    ))
}

/// Left half red, right half blue; handy for crop and mirror assertions.
pub fn split_source(width: u32, height: u32) -> SourceImage {
    SourceImage::from_rgba(RgbaImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    }))
}

/// Data URI of a small solid PNG.
pub fn solid_data_uri(rgb: [u8; 3]) -> String {
    crate::imaging::png_data_uri(&solid_png(4, 4, rgb))
}

// =========================================================================
// Photo records
// =========================================================================

/// Minimal valid record with a tiny embedded image.
pub fn sample_record(id: &str, timestamp: i64) -> PhotoRecord {
    let image = solid_data_uri([200, 150, 180]);
    PhotoRecord {
        id: id.to_string(),
        original: image.clone(),
        enhanced: None,
        assets: vec![image],
        timestamp,
        template: TemplateType::Polaroid,
        filter: FilterType::Normal,
        border_pattern: None,
        ai_preset: None,
    }
}
