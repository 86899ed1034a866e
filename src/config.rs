//! Booth configuration.
//!
//! Handles loading, validating, and merging `blushbooth.toml`. Stock defaults
//! are the base layer; the user file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [render]
//! preview_size = 600        # Base size of live previews (px)
//! final_size = 1200         # Base size of saved and downloaded renders (px)
//! watermark = true          # "BlushBooth ✨" on frameless layouts
//!
//! [capture]
//! timer = 3                 # Countdown seconds: 3, 5 or 10
//! mode = 1                  # Shots per run: 1, 3 or 4
//! muted = false
//! facing = "user"           # "user" (front) or "environment" (back)
//!
//! [storage]
//! data_dir = "blushbooth-data"
//!
//! [ai]
//! model = "gemini-1.5-flash"
//! endpoint = "https://generativelanguage.googleapis.com/v1beta"
//! api_key_env = "GEMINI_API_KEY"
//! timeout_secs = 60
//!
//! [logging]
//! level = "info"            # RUST_LOG overrides this
//! json = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::capture::{Facing, TIMER_CHOICES};
use crate::enhance::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::types::CaptureMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in a directory.
pub const CONFIG_FILENAME: &str = "blushbooth.toml";

/// Largest accepted render base size, in pixels.
const MAX_RENDER_SIZE: u32 = 4096;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Booth configuration loaded from `blushbooth.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoothConfig {
    /// Render sizes and watermark.
    pub render: RenderConfig,
    /// Countdown and camera defaults.
    pub capture: CaptureConfig,
    /// Where photos are kept.
    pub storage: StorageConfig,
    /// AI enhancement service.
    pub ai: AiConfig,
    /// Log level and format.
    pub logging: LoggingConfig,
}

impl BoothConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, size) in [
            ("render.preview_size", self.render.preview_size),
            ("render.final_size", self.render.final_size),
        ] {
            if size == 0 || size > MAX_RENDER_SIZE {
                return Err(ConfigError::Validation(format!(
                    "{key} must be 1-{MAX_RENDER_SIZE}"
                )));
            }
        }
        if !TIMER_CHOICES.contains(&self.capture.timer) {
            return Err(ConfigError::Validation(
                "capture.timer must be 3, 5 or 10".into(),
            ));
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "storage.data_dir must not be empty".into(),
            ));
        }
        if self.ai.model.trim().is_empty() {
            return Err(ConfigError::Validation("ai.model must not be empty".into()));
        }
        if self.ai.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "ai.timeout_secs must be positive".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub preview_size: u32,
    pub final_size: u32,
    pub watermark: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preview_size: 600,
            final_size: 1200,
            watermark: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub timer: u32,
    pub mode: CaptureMode,
    pub muted: bool,
    pub facing: Facing,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timer: TIMER_CHOICES[0],
            mode: CaptureMode::Single,
            muted: false,
            facing: Facing::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Holds `photos/` and the legacy `kv/` directory.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("blushbooth-data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AiConfig {
    pub model: String,
    pub endpoint: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Inline key; takes precedence over `api_key_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// One JSON object per line instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BoothConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` when it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BoothConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BoothConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `blushbooth.toml` from `dir`, or stock defaults if there is none.
pub fn load_config(dir: &Path) -> Result<BoothConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILENAME))
}

/// Load an explicit config file path. A missing file means stock defaults.
pub fn load_config_file(path: &Path) -> Result<BoothConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(path)?)
}

/// Returns a fully-commented stock `blushbooth.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# BlushBooth Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Base size in pixels for the live preview. Layouts add their own margins,
# so a strip of three at 600 comes out 600 x 1740.
preview_size = 600

# Base size for the render that is saved to the gallery and downloaded.
final_size = 1200

# Stamp "BlushBooth ✨" in the corner of frameless and square-frame layouts.
# Polaroids and strips never carry the watermark.
watermark = true

# ---------------------------------------------------------------------------
# Camera and countdown
# ---------------------------------------------------------------------------
[capture]
# Countdown before each shot, in seconds: 3, 5 or 10.
timer = 3

# Shots per booth run: 1 (polaroid), 3 or 4 (strip).
mode = 1

# Silence the countdown beeps and shutter sound.
muted = false

# "user" for the front camera (mirrored), "environment" for the back camera.
facing = "user"

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory for saved photos. Created on first use.
data_dir = "blushbooth-data"

# ---------------------------------------------------------------------------
# AI enhancement
# ---------------------------------------------------------------------------
[ai]
model = "gemini-1.5-flash"
endpoint = "https://generativelanguage.googleapis.com/v1beta"

# Environment variable that holds the API key.
api_key_env = "GEMINI_API_KEY"

# Or put the key here directly (not recommended for shared machines).
# api_key = "..."

# Per-request timeout in seconds.
timeout_secs = 60

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# trace, debug, info, warn or error. RUST_LOG overrides this.
level = "info"

# Emit JSON lines instead of human-readable logs.
json = false
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = BoothConfig::default();
        assert_eq!(config.render.preview_size, 600);
        assert_eq!(config.render.final_size, 1200);
        assert!(config.render.watermark);
        assert_eq!(config.capture.timer, 3);
        assert_eq!(config.capture.mode, CaptureMode::Single);
        assert_eq!(config.capture.facing, Facing::User);
        assert_eq!(config.ai.model, "gemini-1.5-flash");
        assert_eq!(config.ai.api_key, None);
        assert_eq!(config.logging.level, "info");
        config.validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[capture]
timer = 10
mode = 4
facing = "environment"
"#;
        let config: BoothConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.capture.timer, 10);
        assert_eq!(config.capture.mode, CaptureMode::Quad);
        assert_eq!(config.capture.facing, Facing::Environment);
        // Other sections keep their defaults
        assert!(!config.capture.muted);
        assert_eq!(config.render.final_size, 1200);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<BoothConfig, _> = toml::from_str("[render]\nsize = 3\n");
        assert!(result.is_err());
        let result: Result<BoothConfig, _> = toml::from_str("[camera]\n");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_capture_mode_is_a_parse_error() {
        let result: Result<BoothConfig, _> = toml::from_str("[capture]\nmode = 2\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // validate tests
    // =========================================================================

    #[test]
    fn validate_rejects_bad_values() {
        let cases: [fn(&mut BoothConfig); 6] = [
            |c| c.render.preview_size = 0,
            |c| c.render.final_size = MAX_RENDER_SIZE + 1,
            |c| c.capture.timer = 4,
            |c| c.storage.data_dir = PathBuf::new(),
            |c| c.ai.timeout_secs = 0,
            |c| c.logging.level = "loud".into(),
        ];
        for mutate in cases {
            let mut config = BoothConfig::default();
            mutate(&mut config);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Validation(_))
            ));
        }
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str(r#"timer = 3"#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"timer = 5"#).unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged.get("timer").unwrap().as_integer(), Some(5));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str(
            r#"
[render]
preview_size = 600
final_size = 1200
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[render]
final_size = 2000
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        let render = merged.get("render").unwrap();
        assert_eq!(render.get("final_size").unwrap().as_integer(), Some(2000));
        // preview_size preserved from base
        assert_eq!(render.get("preview_size").unwrap().as_integer(), Some(600));
    }

    #[test]
    fn resolve_rejects_invalid_overlay() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[capture]\ntimer = 7\n").unwrap();
        let result = resolve_config(base, Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, BoothConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"
[storage]
data_dir = "/var/lib/booth"

[ai]
api_key = "secret"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/booth"));
        assert_eq!(config.ai.api_key.as_deref(), Some("secret"));
        // Unspecified values should be defaults
        assert_eq!(config.ai.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn load_config_reports_bad_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILENAME), "[render\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: BoothConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, BoothConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        for section in ["[render]", "[capture]", "[storage]", "[ai]", "[logging]"] {
            assert!(content.contains(section), "{section}");
        }
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for section in ["render", "capture", "storage", "ai", "logging"] {
            assert!(val.get(section).is_some(), "{section}");
        }
    }
}
