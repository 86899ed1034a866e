//! Local photo persistence.
//!
//! # Layout
//!
//! ```text
//! <data_dir>/
//! ├── photos/
//! │   ├── 3f2c….json      # one PhotoRecord per file, named by id
//! │   └── …
//! └── kv/
//!     └── blushbooth_photos   # legacy key-value entry, removed after migration
//! ```
//!
//! Records are written whole through a temporary file and a rename, so a
//! crash mid-write leaves either the old file or the new one. A record is
//! created once and deleted by id; nothing edits a stored record in place.
//!
//! ## Legacy migration
//!
//! Older builds kept the whole gallery as one JSON array under the key
//! [`LEGACY_KEY`] of a key-value store. [`migrate_legacy`] copies every entry
//! into the [`PhotoStore`] and only then removes the key. Any failure is
//! logged and leaves the key in place for the next attempt.

use crate::types::{AiPreset, BorderPattern, FilterType, TemplateType};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

pub const LEGACY_KEY: &str = "blushbooth_photos";

const PHOTOS_DIR: &str = "photos";
const KV_DIR: &str = "kv";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("photo not found: {0}")]
    NotFound(String),
    #[error("invalid id: {0:?}")]
    InvalidId(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One saved composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: String,
    /// Final composite without AI styling, as a PNG data URI.
    pub original: String,
    /// Final composite built from the AI-styled shots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced: Option<String>,
    /// The individual shots, as data URIs.
    #[serde(default)]
    pub assets: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub template: TemplateType,
    pub filter: FilterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_pattern: Option<BorderPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_preset: Option<AiPreset>,
}

impl PhotoRecord {
    /// The image to show and download: enhanced when present.
    pub fn display_image(&self) -> &str {
        self.enhanced.as_deref().unwrap_or(&self.original)
    }
}

/// Ids and keys become file names; keep them to one plain path component.
fn checked_name(name: &str) -> Result<&str, StoreError> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(name)
    } else {
        Err(StoreError::InvalidId(name.to_string()))
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

/// Directory-backed record store.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    /// Open (creating if needed) the store under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let dir = data_dir.join(PHOTOS_DIR);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(format!("{}.json", checked_name(id)?)))
    }

    #[instrument(skip_all, fields(id = %record.id))]
    pub fn save(&self, record: &PhotoRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.id)?;
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &json)?;
        debug!(bytes = json.len(), "record saved");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<PhotoRecord, StoreError> {
        let path = self.path_for(id)?;
        let content = match std::fs::read(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&content)?)
    }

    /// Every record, newest first. Unreadable files are skipped with a warning.
    pub fn list_all(&self) -> Result<Vec<PhotoRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("json")
            {
                continue;
            }
            let parsed = std::fs::read(path)
                .map_err(StoreError::from)
                .and_then(|bytes| Ok(serde_json::from_slice::<PhotoRecord>(&bytes)?));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable record"),
            }
        }
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    #[instrument(skip(self))]
    pub fn delete_by_id(&self, id: &str) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("record deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Plain string values, one file per key.
#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let dir = data_dir.join(KV_DIR);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.dir.join(checked_name(key)?);
        match std::fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.dir.join(checked_name(key)?);
        Ok(write_atomic(&path, value.as_bytes())?)
    }

    /// Remove `key`. Removing a missing key is not an error.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.dir.join(checked_name(key)?);
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// What [`migrate_legacy`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    NothingToMigrate,
    Migrated(usize),
    /// The legacy key was kept; the message says why.
    Failed(String),
}

/// Move the legacy gallery array into `store`. Never fails; see
/// [`MigrationOutcome`].
#[instrument(skip_all)]
pub fn migrate_legacy(kv: &KvStore, store: &PhotoStore) -> MigrationOutcome {
    let raw = match kv.get(LEGACY_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return MigrationOutcome::NothingToMigrate,
        Err(e) => {
            error!(error = %e, "Migration failed");
            return MigrationOutcome::Failed(e.to_string());
        }
    };

    match copy_legacy_records(&raw, store).and_then(|n| kv.remove(LEGACY_KEY).map(|()| n)) {
        Ok(count) => {
            info!(count, "migrated legacy photos");
            MigrationOutcome::Migrated(count)
        }
        Err(e) => {
            error!(error = %e, "Migration failed");
            MigrationOutcome::Failed(e.to_string())
        }
    }
}

fn copy_legacy_records(raw: &str, store: &PhotoStore) -> Result<usize, StoreError> {
    let records: Vec<PhotoRecord> = serde_json::from_str(raw)?;
    for record in &records {
        store.save(record)?;
    }
    Ok(records.len())
}
