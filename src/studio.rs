//! Editor and gallery state, and where collaborator failures meet the user.
//!
//! [`EditSession`] holds one batch of shots between capture and save: the
//! adjustments, template, border, and the optional AI-styled copies.
//! [`Studio`] holds the in-memory gallery on top of a [`PhotoStore`].
//!
//! Errors from the store, the AI service and the camera are turned into
//! [`Notice`]s here. Gallery state only changes after the store confirms.

use crate::capture::CaptureError;
use crate::enhance::{Enhancer, enhance_batch};
use crate::imaging::{
    ComposedOutput, RenderRequest, SourceError, SourceImage, compose, decode_data_uri,
};
use crate::store::{KvStore, MigrationOutcome, PhotoRecord, PhotoStore, StoreError, migrate_legacy};
use crate::types::{AiPreset, BorderPattern, FilterSettings, TemplateType};
use chrono::{DateTime, Local};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub const SAVE_FAILED: &str = "Oops! We couldn't save your photo.";
pub const RENDER_FAILED: &str = "Failed to save photo. Please try again.";
pub const AI_UNAVAILABLE: &str = "AI Magic unavailable right now.";
pub const DELETE_FAILED: &str = "Couldn't delete that photo.";

/// Something to tell the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Notice {
    pub message: String,
    /// Must be acknowledged before the user can carry on.
    pub blocking: bool,
    /// Offer a retry button.
    pub retry: bool,
}

impl Notice {
    pub fn blocking(message: &str) -> Self {
        Self {
            message: message.to_string(),
            blocking: true,
            retry: false,
        }
    }

    pub fn passing(message: &str) -> Self {
        Self {
            message: message.to_string(),
            blocking: false,
            retry: false,
        }
    }

    pub fn from_capture(err: &CaptureError) -> Self {
        Self {
            message: err.to_string(),
            blocking: true,
            retry: err.is_retryable(),
        }
    }
}

/// `blushbooth-<ms timestamp>.png`, for a fresh edit.
pub fn download_name_fresh(timestamp_ms: i64) -> String {
    format!("blushbooth-{timestamp_ms}.png")
}

/// `blushbooth-<id>.png`, for a gallery photo.
pub fn download_name_for(id: &str) -> String {
    format!("blushbooth-{id}.png")
}

/// Write `png` to `dir/name`, creating `dir` if needed.
pub fn write_download(dir: &Path, name: &str, png: &[u8]) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(name);
    std::fs::write(&path, png)?;
    Ok(path)
}

// =========================================================================
// Editor
// =========================================================================

/// A finished edit, ready to download and store.
#[derive(Debug, Clone)]
pub struct Finalized {
    pub output: ComposedOutput,
    pub record: PhotoRecord,
    pub download_name: String,
}

/// One batch of shots being edited.
#[derive(Debug, Clone)]
pub struct EditSession {
    images: Vec<SourceImage>,
    enhanced: Option<Vec<SourceImage>>,
    pub settings: FilterSettings,
    pub template: TemplateType,
    pub border_pattern: BorderPattern,
    selected_preset: AiPreset,
    applied_preset: AiPreset,
}

impl EditSession {
    /// Single shots start as a polaroid, batches as a strip.
    pub fn new(images: Vec<SourceImage>, border_pattern: BorderPattern) -> Self {
        Self {
            template: TemplateType::default_for(images.len()),
            images,
            enhanced: None,
            settings: FilterSettings::default(),
            border_pattern,
            selected_preset: AiPreset::None,
            applied_preset: AiPreset::None,
        }
    }

    pub fn images(&self) -> &[SourceImage] {
        &self.images
    }

    pub fn enhanced(&self) -> Option<&[SourceImage]> {
        self.enhanced.as_deref()
    }

    /// What gets rendered: the AI-styled shots when there are any.
    pub fn active_images(&self) -> &[SourceImage] {
        self.enhanced.as_deref().unwrap_or(&self.images)
    }

    pub fn selected_preset(&self) -> AiPreset {
        self.selected_preset
    }

    pub fn applied_preset(&self) -> AiPreset {
        self.applied_preset
    }

    pub fn select_preset(&mut self, preset: AiPreset) {
        self.selected_preset = preset;
    }

    /// Apply the selected preset to every shot. `none` drops any styled
    /// copies without a call. On failure the previous state is kept.
    #[instrument(skip_all, fields(preset = %self.selected_preset))]
    pub async fn apply_enhance<E: Enhancer + 'static>(
        &mut self,
        enhancer: Arc<E>,
    ) -> Result<(), Notice> {
        if self.selected_preset == AiPreset::None {
            self.enhanced = None;
            self.applied_preset = AiPreset::None;
            return Ok(());
        }
        match enhance_batch(enhancer, &self.images, self.selected_preset).await {
            Ok(styled) => {
                self.enhanced = Some(styled);
                self.applied_preset = self.selected_preset;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "enhancement failed");
                Err(Notice::passing(AI_UNAVAILABLE))
            }
        }
    }

    /// Render request for the current edit state.
    pub fn render_request(&self, size: u32, watermark: bool) -> RenderRequest {
        RenderRequest::new(
            self.settings,
            self.template,
            self.border_pattern,
            size,
            size,
        )
        .with_watermark(watermark)
    }

    /// Live preview request. Previews never carry the watermark.
    pub fn preview_request(&self, size: u32) -> RenderRequest {
        self.render_request(size, false)
    }

    /// Final render plus the record to store, stamped with the current time.
    pub fn finalize(&self, size: u32, watermark: bool) -> Result<Finalized, Notice> {
        self.finalize_at(size, watermark, Local::now(), None)
    }

    /// [`finalize`](Self::finalize) at a fixed time, optionally with fixed grain.
    #[instrument(skip_all, fields(images = self.images.len(), template = %self.template))]
    pub fn finalize_at(
        &self,
        size: u32,
        watermark: bool,
        now: DateTime<Local>,
        grain_seed: Option<u64>,
    ) -> Result<Finalized, Notice> {
        let mut request = self.render_request(size, watermark).with_date(now.date_naive());
        request.grain_seed = grain_seed;

        let output = compose(self.active_images(), &request);
        if output.is_empty() {
            error!("final render produced no image");
            return Err(Notice::blocking(RENDER_FAILED));
        }

        let assets = self
            .images
            .iter()
            .map(SourceImage::to_data_uri)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                error!(error = %e, "could not encode shots for the record");
                Notice::blocking(RENDER_FAILED)
            })?;

        let final_uri = output.to_data_uri();
        let timestamp = now.timestamp_millis();
        let record = PhotoRecord {
            id: uuid::Uuid::new_v4().to_string(),
            enhanced: self.enhanced.as_ref().map(|_| final_uri.clone()),
            original: final_uri,
            assets,
            timestamp,
            template: self.template,
            filter: self.settings.filter_type,
            border_pattern: Some(self.border_pattern),
            ai_preset: Some(self.applied_preset),
        };
        Ok(Finalized {
            output,
            record,
            download_name: download_name_fresh(timestamp),
        })
    }
}

// =========================================================================
// Gallery
// =========================================================================

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("photo not found: {0}")]
    NotFound(String),
    #[error("stored image is unreadable: {0}")]
    Image(#[from] SourceError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// The gallery: stored records mirrored in memory, newest first.
#[derive(Debug)]
pub struct Studio {
    store: PhotoStore,
    photos: Vec<PhotoRecord>,
}

impl Studio {
    /// Open the data directory, migrate legacy photos, and load the gallery.
    /// A failed load leaves the gallery empty rather than failing.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let store = PhotoStore::open(data_dir)?;
        let kv = KvStore::open(data_dir)?;
        if let MigrationOutcome::Migrated(count) = migrate_legacy(&kv, &store) {
            info!(count, "legacy gallery imported");
        }
        Ok(Self::with_store(store))
    }

    pub fn with_store(store: PhotoStore) -> Self {
        let photos = store.list_all().unwrap_or_else(|e| {
            error!(error = %e, "Failed to load photos");
            Vec::new()
        });
        Self { store, photos }
    }

    pub fn photos(&self) -> &[PhotoRecord] {
        &self.photos
    }

    pub fn get(&self, id: &str) -> Option<&PhotoRecord> {
        self.photos.iter().find(|p| p.id == id)
    }

    /// Persist `record`, then show it first in the gallery.
    pub fn save(&mut self, record: PhotoRecord) -> Result<(), Notice> {
        match self.store.save(&record) {
            Ok(()) => {
                self.photos.insert(0, record);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to save photo");
                Err(Notice::blocking(SAVE_FAILED))
            }
        }
    }

    /// Delete from the store, then from the gallery. Failures are logged
    /// and leave the gallery untouched.
    pub fn delete(&mut self, id: &str) -> Result<(), Notice> {
        if let Err(e) = self.store.delete_by_id(id) {
            error!(id, error = %e, "Failed to delete photo");
            return Err(Notice::blocking(DELETE_FAILED));
        }
        self.photos.retain(|p| p.id != id);
        Ok(())
    }

    /// Write the display image of `id` as `blushbooth-<id>.png` under `dir`.
    pub fn export(&self, id: &str, dir: &Path) -> Result<PathBuf, ExportError> {
        let record = self
            .get(id)
            .ok_or_else(|| ExportError::NotFound(id.to_string()))?;
        let bytes = decode_data_uri(record.display_image())?;
        Ok(write_download(dir, &download_name_for(id), &bytes)?)
    }
}
