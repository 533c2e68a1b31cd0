//! Converter configuration module.
//!
//! Handles loading, validating, and merging a `imgconv.toml` file. User
//! files are sparse: stock defaults are the base layer and any key the
//! user sets overrides it.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [conversion]
//! format = "jpeg"                # jpeg | png | webp | bmp | tiff | ico
//! quality = 0.9                  # 0.0 - 1.0 (lossy encoders only)
//! # width = 1024                 # Target width in pixels (omit to keep)
//! # height = 768                 # Target height in pixels (omit to keep)
//! maintain_aspect_ratio = true   # Link width/height fields while editing
//!
//! [batch]
//! pacing_ms = 100                # Pause between converted items
//! # item_timeout_ms = 30000      # Give up on a single item after this long
//!
//! [download]
//! archive_name = "converted-images.zip"
//! fallback_pacing_ms = 500       # Pause before each file when not bundling
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! The `[conversion]` section only seeds the initial control values. Each
//! batch runs with an explicit [`ConversionConfig`] captured by the caller.

use crate::format::OutputFormat;
use crate::imaging::Quality;
use crate::types::ConversionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default config filename looked up by [`load_config_from_dir`].
pub const CONFIG_FILENAME: &str = "imgconv.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Converter configuration loaded from `imgconv.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Initial conversion controls.
    pub conversion: ConversionDefaults,
    /// Batch pacing and per-item limits.
    pub batch: BatchSettings,
    /// Bundled and individual download behavior.
    pub download: DownloadSettings,
}

impl ConverterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.item_timeout_ms == Some(0) {
            return Err(ConfigError::Validation(
                "batch.item_timeout_ms must be greater than zero".into(),
            ));
        }
        let name = self.download.archive_name.trim();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "download.archive_name must not be empty".into(),
            ));
        }
        if name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "download.archive_name must be a file name, not a path".into(),
            ));
        }
        Ok(())
    }

    /// The per-run conversion config seeded from `[conversion]`.
    pub fn conversion(&self) -> ConversionConfig {
        let c = &self.conversion;
        ConversionConfig {
            output_format: c.format,
            quality: c.quality,
            target_width: c.width,
            target_height: c.height,
            maintain_aspect_ratio: c.maintain_aspect_ratio,
        }
    }
}

/// Initial values for the conversion controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionDefaults {
    pub format: OutputFormat,
    pub quality: Quality,
    pub width: Option<NonZeroU32>,
    pub height: Option<NonZeroU32>,
    pub maintain_aspect_ratio: bool,
}

impl Default for ConversionDefaults {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: Quality::default(),
            width: None,
            height: None,
            maintain_aspect_ratio: true,
        }
    }
}

/// Batch run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchSettings {
    /// Pause after each item, in milliseconds. A UX throttle only.
    pub pacing_ms: u64,
    /// Per-item time limit. When absent, a hung decode or encode blocks
    /// the batch indefinitely.
    pub item_timeout_ms: Option<u64>,
}

impl BatchSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn item_timeout(&self) -> Option<Duration> {
        self.item_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            pacing_ms: 100,
            item_timeout_ms: None,
        }
    }
}

/// Download settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadSettings {
    /// File name of the bundle produced for two or more results.
    pub archive_name: String,
    /// Pause before each file when delivering results one by one.
    pub fallback_pacing_ms: u64,
}

impl DownloadSettings {
    pub fn fallback_pacing(&self) -> Duration {
        Duration::from_millis(self.fallback_pacing_ms)
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            archive_name: "converted-images.zip".to_string(),
            fallback_pacing_ms: 500,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ConverterConfig::default()).expect("default config must serialize")
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

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ConverterConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file yields the stock defaults. A present file must parse,
/// contain only known keys, and pass validation.
pub fn load_config(path: &Path) -> Result<ConverterConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Load `imgconv.toml` from a directory.
pub fn load_config_from_dir(dir: &Path) -> Result<ConverterConfig, ConfigError> {
    load_config(&dir.join(CONFIG_FILENAME))
}

/// Returns a fully-commented stock `imgconv.toml` with all keys and explanations.
pub fn stock_config_toml() -> &'static str {
    r##"# imgconv configuration
# =====================
# All options are optional. Values shown are the defaults.
# Unknown keys are rejected.

[conversion]
# Output format selected when the session starts.
# One of: jpeg, png, webp, bmp, tiff, ico
format = "jpeg"

# Encoding quality from 0.0 (smallest) to 1.0 (best).
# Only lossy encoders (JPEG) use it.
quality = 0.9

# Target size in pixels. Omit both to keep the original size.
# Give one to scale the other edge proportionally; give both to force an
# exact size.
# width = 1024
# height = 768

# Keep the width and height fields linked while editing them.
maintain_aspect_ratio = true

[batch]
# Pause after each converted item, in milliseconds.
pacing_ms = 100

# Abandon a single item after this many milliseconds.
# Omit to wait indefinitely.
# item_timeout_ms = 30000

[download]
# Name of the archive produced when downloading two or more results.
archive_name = "converted-images.zip"

# Pause before each file when results are delivered individually,
# in milliseconds.
fallback_pacing_ms = 500
"##
}
