//! Editor configuration
//!
//! Every value here was a hard-coded constant in the first version of the
//! tool. They are defaults now, overridable from a JSON file:
//!
//! ```json
//! { "background_threshold": 60, "preview_max_width": 320 }
//! ```
//!
//! Missing keys fall back to `EditorSettings::default()`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::encoder::{OutputFormat, DEFAULT_MATTE};
use crate::error::Result;
use crate::resample::Interpolation;

/// Default similarity cutoff for background removal
pub const DEFAULT_BACKGROUND_THRESHOLD: u32 = 100;

/// Default cap for on-screen previews, in logical pixels
pub const DEFAULT_PREVIEW_MAX_WIDTH: u32 = 400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Manhattan RGB distance below which a pixel counts as background (default: 100)
    pub background_threshold: u32,
    /// Widest preview the UI draws; height follows the aspect ratio (default: 400)
    pub preview_max_width: u32,
    /// Filter used when resizing (default: bilinear)
    pub interpolation: Interpolation,
    /// JPEG quality, 1-100 (default: 92)
    pub jpeg_quality: u8,
    /// Color transparent pixels are blended onto for JPEG output (default: black)
    pub jpeg_matte: [u8; 3],
    /// Largest accepted resize target on either axis (default: 16384)
    pub max_dimension: u32,
    /// Format used for downloads before any conversion (default: png)
    pub default_format: OutputFormat,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            background_threshold: DEFAULT_BACKGROUND_THRESHOLD,
            preview_max_width: DEFAULT_PREVIEW_MAX_WIDTH,
            interpolation: Interpolation::Bilinear,
            jpeg_quality: 92,
            jpeg_matte: DEFAULT_MATTE,
            max_dimension: 16384,
            default_format: OutputFormat::Png,
        }
    }
}

impl EditorSettings {
    /// Parse settings from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: EditorSettings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    /// Load settings from disk, or defaults when the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings = Self::from_json(&content)?;
        log::info!("Loaded editor settings from {}", path.display());
        Ok(settings)
    }

    /// Write settings to disk as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Clamp values a hand-edited file could get wrong
    fn sanitized(mut self) -> Self {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.preview_max_width = self.preview_max_width.max(1);
        self.max_dimension = self.max_dimension.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EditorSettings::default();
        assert_eq!(settings.background_threshold, 100);
        assert_eq!(settings.preview_max_width, 400);
        assert_eq!(settings.interpolation, Interpolation::Bilinear);
        assert_eq!(settings.default_format, OutputFormat::Png);
        assert_eq!(settings.jpeg_matte, [0, 0, 0]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = EditorSettings::from_json(r#"{ "background_threshold": 42 }"#).unwrap();
        assert_eq!(settings.background_threshold, 42);
        assert_eq!(settings.preview_max_width, 400);
        assert_eq!(settings.jpeg_quality, 92);
    }

    #[test]
    fn test_enum_fields_from_json() {
        let json = r#"{ "interpolation": "lanczos3", "default_format": "webp", "jpeg_quality": 0, "jpeg_matte": [255, 255, 255] }"#;
        let settings = EditorSettings::from_json(json).unwrap();
        assert_eq!(settings.interpolation, Interpolation::Lanczos3);
        assert_eq!(settings.default_format, OutputFormat::WebP);
        assert_eq!(settings.jpeg_quality, 1);
        assert_eq!(settings.jpeg_matte, [255, 255, 255]);
    }

    #[test]
    fn test_bad_json() {
        let result = EditorSettings::from_json("{ not json");
        assert!(matches!(result, Err(crate::error::EditorError::Json(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("editor.json");

        let missing = EditorSettings::load(&path).unwrap();
        assert_eq!(missing, EditorSettings::default());

        let settings = EditorSettings {
            background_threshold: 30,
            ..EditorSettings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(EditorSettings::load(&path).unwrap(), settings);
    }
}
