//! Decoded source photos.
//!
//! All decoding happens here, before composition: the compositor only ever
//! sees [`SourceImage`]s. A batch is decoded in parallel with rayon and the
//! whole batch fails if any one image does.
//!
//! Images travel between the booth, the editor and the gallery as PNG data
//! URIs (`data:image/png;base64,…`), so this module also owns that encoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{ImageFormat, RgbaImage};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("not an image data URI: {0}")]
    InvalidDataUri(String),
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Immutable decoded photo. Cloning is cheap; pixels are shared.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    id: String,
    pixels: Arc<RgbaImage>,
}

fn hash_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl SourceImage {
    /// Decode PNG, JPEG or WebP bytes. The id is the SHA-256 of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SourceError> {
        let pixels = image::load_from_memory(bytes)?.to_rgba8();
        Ok(Self {
            id: hash_hex(bytes),
            pixels: Arc::new(pixels),
        })
    }

    pub fn from_data_uri(uri: &str) -> Result<Self, SourceError> {
        Self::from_bytes(&decode_data_uri(uri)?)
    }

    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let bytes = std::fs::read(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Wrap pixels that are already decoded, e.g. a camera frame.
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(pixels.width().to_le_bytes());
        hasher.update(pixels.height().to_le_bytes());
        hasher.update(pixels.as_raw());
        Self {
            id: format!("{:x}", hasher.finalize()),
            pixels: Arc::new(pixels),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, SourceError> {
        let mut buf = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(buf)
    }

    pub fn to_data_uri(&self) -> Result<String, SourceError> {
        Ok(png_data_uri(&self.to_png()?))
    }
}

/// Decode a batch of encoded images in parallel, preserving order.
pub fn decode_all<B: AsRef<[u8]> + Sync>(batch: &[B]) -> Result<Vec<SourceImage>, SourceError> {
    batch
        .par_iter()
        .map(|bytes| SourceImage::from_bytes(bytes.as_ref()))
        .collect()
}

/// Decode a batch of data URIs in parallel, preserving order.
pub fn decode_data_uris<S: AsRef<str> + Sync>(uris: &[S]) -> Result<Vec<SourceImage>, SourceError> {
    uris.par_iter()
        .map(|uri| SourceImage::from_data_uri(uri.as_ref()))
        .collect()
}

/// Load image files in parallel, preserving order.
pub fn open_all<P: AsRef<Path> + Sync>(paths: &[P]) -> Result<Vec<SourceImage>, SourceError> {
    paths
        .par_iter()
        .map(|p| SourceImage::open(p.as_ref()))
        .collect()
}

pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

/// Raw bytes of a base64 `data:` URI. Any image media type is accepted.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, SourceError> {
    let invalid = || SourceError::InvalidDataUri(uri.chars().take(40).collect());
    let (header, payload) = uri.trim().split_once(',').ok_or_else(invalid)?;
    let media = header
        .strip_prefix("data:")
        .and_then(|h| h.strip_suffix(";base64"))
        .ok_or_else(invalid)?;
    if !media.starts_with("image/") {
        return Err(invalid());
    }
    Ok(BASE64.decode(payload)?)
}
