//! Editor session state
//!
//! Holds what the front end works on between button presses:
//! - **Original**: the uploaded image, never modified
//! - **Aspect ratio**: captured from the original at load, used by every
//!   locked resize
//! - **Current**: result of the last successful operation; the next
//!   operation starts from it and downloads export it
//! - **Resize inputs**: the linked width/height fields
//!
//! The session is a plain value owned by the caller. Transformations in
//! `resample`, `background` and `encoder` stay stateless; the session only
//! threads their inputs and outputs. A failed operation leaves the current
//! image untouched.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use crate::background::{self, BackgroundRemovalSpec};
use crate::bitmap::Bitmap;
use crate::encoder::{self, DownloadFile, OutputFormat};
use crate::error::{EditorError, Result};
use crate::loader;
use crate::resample::{self, AspectRatio, ResizeSpec};
use crate::settings::EditorSettings;

/// Snapshot of the loaded image, sized for the front end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub original_size: (u32, u32),
    pub current_size: (u32, u32),
    /// Original scaled to the preview cap
    pub original_preview: (u32, u32),
    /// Current scaled to the preview cap
    pub current_preview: (u32, u32),
    /// Format the next download is written in
    pub format: OutputFormat,
    /// Pixels cleared by the last background removal, if that was the last operation
    pub removed_pixels: Option<usize>,
}

#[derive(Debug, Clone)]
struct LoadedImage {
    original: Bitmap,
    aspect: AspectRatio,
    current: Bitmap,
    format: OutputFormat,
    inputs: ResizeSpec,
}

#[derive(Debug, Clone, Default)]
pub struct EditorSession {
    settings: EditorSettings,
    image: Option<LoadedImage>,
    last_export_millis: i64,
}

impl EditorSession {
    pub fn new(settings: EditorSettings) -> Self {
        Self {
            settings,
            image: None,
            last_export_millis: 0,
        }
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EditorSettings) {
        self.settings = settings;
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    // ========================================================================
    // LOADING
    // ========================================================================

    /// Make `bitmap` the new original and current image
    pub fn install(&mut self, bitmap: Bitmap) -> ImageInfo {
        let aspect = AspectRatio::of(&bitmap);
        let (width, height) = bitmap.dimensions();
        self.image = Some(LoadedImage {
            aspect,
            current: bitmap.clone(),
            original: bitmap,
            format: self.settings.default_format,
            inputs: ResizeSpec {
                target_width: width,
                target_height: height,
                lock_aspect_ratio: true,
            },
        });
        log::info!("Loaded {}x{} image into session", width, height);
        self.describe(None)
    }

    /// Decode an upload and install it
    ///
    /// On error the previously loaded image (if any) stays in place.
    pub async fn load(&mut self, bytes: Vec<u8>) -> Result<ImageInfo> {
        let bitmap = loader::load(bytes).await?;
        Ok(self.install(bitmap))
    }

    pub fn original(&self) -> Option<&Bitmap> {
        self.image.as_ref().map(|img| &img.original)
    }

    pub fn current(&self) -> Option<&Bitmap> {
        self.image.as_ref().map(|img| &img.current)
    }

    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        self.image.as_ref().map(|img| img.aspect)
    }

    pub fn info(&self) -> Option<ImageInfo> {
        self.image.as_ref().map(|_| self.describe(None))
    }

    // ========================================================================
    // RESIZE INPUTS
    // ========================================================================

    pub fn resize_inputs(&self) -> Result<ResizeSpec> {
        Ok(self.loaded()?.inputs)
    }

    pub fn set_lock_aspect_ratio(&mut self, locked: bool) -> Result<ResizeSpec> {
        let img = self.loaded_mut()?;
        img.inputs.lock_aspect_ratio = locked;
        if locked {
            let width = img.inputs.target_width;
            img.inputs.set_width(width, &img.aspect);
        }
        Ok(img.inputs)
    }

    pub fn set_width(&mut self, width: u32) -> Result<ResizeSpec> {
        let img = self.loaded_mut()?;
        img.inputs.set_width(width, &img.aspect);
        Ok(img.inputs)
    }

    pub fn set_height(&mut self, height: u32) -> Result<ResizeSpec> {
        let img = self.loaded_mut()?;
        img.inputs.set_height(height, &img.aspect);
        Ok(img.inputs)
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Resize the current image
    ///
    /// With the lock on, a size matching either linked derivation from the
    /// original aspect ratio is used as given; any other height is
    /// re-derived from the width. The session's lock setting is kept.
    pub fn resize(&mut self, spec: &ResizeSpec) -> Result<ImageInfo> {
        let interpolation = self.settings.interpolation;
        let max_dimension = self.settings.max_dimension;
        let img = self.loaded_mut()?;

        let spec = spec.reconciled(&img.aspect);
        spec.validate(max_dimension)?;

        let resized = resample::resample(&img.current, &spec, interpolation)?;
        img.current = resized;
        img.format = OutputFormat::Png;
        img.inputs = ResizeSpec {
            lock_aspect_ratio: img.inputs.lock_aspect_ratio,
            ..spec
        };

        log::info!("Resized to {}x{}", spec.target_width, spec.target_height);
        Ok(self.describe(None))
    }

    /// Re-encode the current image; the next download uses `format`
    ///
    /// The current image becomes the decoded result of that encode, so JPEG
    /// artifacts and the matte behind transparent pixels show up in the
    /// preview.
    pub fn convert(&mut self, format: OutputFormat) -> Result<ImageInfo> {
        let quality = self.settings.jpeg_quality;
        let matte = self.settings.jpeg_matte;
        let img = self.loaded_mut()?;

        let bytes = encoder::encode_with_matte(&img.current, format, quality, matte)?;
        let converted = if format.is_lossy() {
            loader::decode(&bytes).map_err(|e| {
                EditorError::EncodeFailure(format!("{} output could not be read back: {}", format, e))
            })?
        } else {
            img.current.clone()
        };

        img.current = converted;
        img.format = format;

        log::info!("Converted to {}", format);
        Ok(self.describe(None))
    }

    /// Clear the background of the current image, keyed on its top-left pixel
    pub fn remove_background(&mut self, threshold: Option<u32>) -> Result<ImageInfo> {
        let threshold = threshold.unwrap_or(self.settings.background_threshold);
        let current = &self.loaded()?.current;
        let spec = BackgroundRemovalSpec::from_corner(current, threshold);
        self.remove_background_with(&spec)
    }

    /// Clear pixels matching an explicit reference color
    pub fn remove_background_with(&mut self, spec: &BackgroundRemovalSpec) -> Result<ImageInfo> {
        let img = self.loaded_mut()?;

        let result = background::remove_background(&img.current, spec)?;
        img.current = result.bitmap;
        img.format = OutputFormat::Png;

        log::info!("Removed background ({} pixels cleared)", result.removed_pixels);
        Ok(self.describe(Some(result.removed_pixels)))
    }

    /// Drop every edit and start again from the original
    pub fn reset(&mut self) -> Result<ImageInfo> {
        let default_format = self.settings.default_format;
        let img = self.loaded_mut()?;
        let (width, height) = img.original.dimensions();

        img.current = img.original.clone();
        img.format = default_format;
        img.inputs = ResizeSpec {
            target_width: width,
            target_height: height,
            lock_aspect_ratio: img.inputs.lock_aspect_ratio,
        };
        Ok(self.describe(None))
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    /// Encode the current image for download
    pub fn export(&mut self) -> Result<DownloadFile> {
        let quality = self.settings.jpeg_quality;
        let matte = self.settings.jpeg_matte;
        let img = self.loaded()?;
        let format = img.format;
        let bytes = encoder::encode_with_matte(&img.current, format, quality, matte)?;

        let stamp = self.next_export_stamp();
        let filename = encoder::download_filename(format, stamp);
        log::info!("Prepared download {} ({} bytes)", filename, bytes.len());

        Ok(DownloadFile {
            filename,
            format,
            bytes,
        })
    }

    /// Export into `dir`, returning the written path
    pub fn export_to_dir(&mut self, dir: &Path) -> Result<PathBuf> {
        let file = self.export()?;
        fs::create_dir_all(dir)?;
        let path = dir.join(&file.filename);
        fs::write(&path, &file.bytes)?;
        Ok(path)
    }

    /// Milliseconds since the epoch, bumped so names never repeat
    fn next_export_stamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_export_millis = now.max(self.last_export_millis + 1);
        self.last_export_millis
    }

    // ========================================================================
    // PREVIEW
    // ========================================================================

    pub fn original_preview_size(&self) -> Option<(u32, u32)> {
        self.original()
            .map(|b| b.preview_size(self.settings.preview_max_width))
    }

    pub fn current_preview_size(&self) -> Option<(u32, u32)> {
        self.current()
            .map(|b| b.preview_size(self.settings.preview_max_width))
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn loaded(&self) -> Result<&LoadedImage> {
        self.image.as_ref().ok_or_else(EditorError::no_image)
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedImage> {
        self.image.as_mut().ok_or_else(EditorError::no_image)
    }

    fn describe(&self, removed_pixels: Option<usize>) -> ImageInfo {
        let max_width = self.settings.preview_max_width;
        match &self.image {
            Some(img) => ImageInfo {
                original_size: img.original.dimensions(),
                current_size: img.current.dimensions(),
                original_preview: img.original.preview_size(max_width),
                current_preview: img.current.preview_size(max_width),
                format: img.format,
                removed_pixels,
            },
            None => ImageInfo {
                original_size: (0, 0),
                current_size: (0, 0),
                original_preview: (0, 0),
                current_preview: (0, 0),
                format: self.settings.default_format,
                removed_pixels,
            },
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// White canvas with a red square in the middle
    fn sprite(width: u32, height: u32) -> Bitmap {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for y in 0..height {
            for x in 0..width {
                let inside = x >= width / 4 && x < width * 3 / 4 && y >= height / 4 && y < height * 3 / 4;
                if inside {
                    data.extend_from_slice(&[220, 20, 20, 255]);
                } else {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                }
            }
        }
        Bitmap::from_raw(width, height, data).unwrap()
    }

    fn loaded_session(width: u32, height: u32) -> EditorSession {
        let mut session = EditorSession::default();
        session.install(sprite(width, height));
        session
    }

    #[test]
    fn test_operations_need_an_image() {
        let mut session = EditorSession::default();
        assert!(matches!(session.resize(&ResizeSpec::new(10, 10)), Err(EditorError::InvalidInput(_))));
        assert!(matches!(session.convert(OutputFormat::Jpeg), Err(EditorError::InvalidInput(_))));
        assert!(matches!(session.remove_background(None), Err(EditorError::InvalidInput(_))));
        assert!(matches!(session.export(), Err(EditorError::InvalidInput(_))));
        assert!(matches!(session.set_width(10), Err(EditorError::InvalidInput(_))));
        assert!(session.current().is_none());
    }

    #[test]
    fn test_install_captures_inputs() {
        let session = loaded_session(800, 600);
        let inputs = session.resize_inputs().unwrap();
        assert_eq!((inputs.target_width, inputs.target_height), (800, 600));
        assert!(inputs.lock_aspect_ratio);
        assert_eq!(session.original_preview_size(), Some((400, 300)));
    }

    #[test]
    fn test_locked_resize_800x600() {
        let mut session = loaded_session(800, 600);
        let spec = ResizeSpec {
            target_width: 400,
            target_height: 0,
            lock_aspect_ratio: true,
        };
        let info = session.resize(&spec).unwrap();
        assert_eq!(info.current_size, (400, 300));
        assert_eq!(info.original_size, (800, 600));
        assert_eq!(info.format, OutputFormat::Png);
    }

    #[test]
    fn test_zero_width_leaves_current_unchanged() {
        let mut session = loaded_session(80, 60);
        session.resize(&ResizeSpec::new(40, 30)).unwrap();
        let before = session.current().unwrap().clone();

        let result = session.resize(&ResizeSpec::new(0, 30));
        assert!(matches!(result, Err(EditorError::InvalidDimension(_))));
        assert_eq!(session.current().unwrap(), &before);
    }

    #[test]
    fn test_size_cap() {
        let mut session = EditorSession::new(EditorSettings {
            max_dimension: 100,
            ..EditorSettings::default()
        });
        session.install(sprite(10, 10));
        let result = session.resize(&ResizeSpec::new(101, 50));
        assert!(matches!(result, Err(EditorError::InvalidDimension(_))));
        assert_eq!(session.current().unwrap().dimensions(), (10, 10));
    }

    #[test]
    fn test_lock_uses_original_ratio_after_chaining() {
        let mut session = loaded_session(997, 613);
        for w in [300u32, 451, 17, 800] {
            let spec = ResizeSpec {
                target_width: w,
                target_height: 1,
                lock_aspect_ratio: true,
            };
            let info = session.resize(&spec).unwrap();
            let expected = ((613.0 * w as f64) / 997.0).round() as u32;
            assert_eq!(info.current_size, (w, expected));
        }
    }

    #[test]
    fn test_linked_inputs_follow_original() {
        let mut session = loaded_session(800, 600);
        session.resize(&ResizeSpec::new(123, 45)).unwrap();

        let inputs = session.set_width(400).unwrap();
        assert_eq!(inputs.target_height, 300);

        session.set_lock_aspect_ratio(false).unwrap();
        let inputs = session.set_height(10).unwrap();
        assert_eq!((inputs.target_width, inputs.target_height), (400, 10));
    }

    #[test]
    fn test_height_driven_locked_resize_on_tall_image() {
        let mut session = loaded_session(100, 1000);
        let inputs = session.set_height(1005).unwrap();
        assert_eq!((inputs.target_width, inputs.target_height), (101, 1005));

        let info = session.resize(&inputs).unwrap();
        assert_eq!(info.current_size, (101, 1005));
        assert_eq!(session.resize_inputs().unwrap(), inputs);
    }

    #[test]
    fn test_free_resize_keeps_session_lock() {
        let mut session = loaded_session(800, 600);
        session.resize(&ResizeSpec::new(123, 45)).unwrap();

        let inputs = session.resize_inputs().unwrap();
        assert_eq!((inputs.target_width, inputs.target_height), (123, 45));
        assert!(inputs.lock_aspect_ratio);
    }

    #[test]
    fn test_remove_background_chains_from_current() {
        let mut session = loaded_session(16, 16);
        let info = session.remove_background(None).unwrap();
        // Everything outside the 8x8 red square is white
        assert_eq!(info.removed_pixels, Some(16 * 16 - 8 * 8));

        let current = session.current().unwrap();
        assert_eq!(current.pixel(0, 0)[3], 0);
        assert_eq!(current.pixel(8, 8), [220, 20, 20, 255]);
        // Original untouched
        assert_eq!(session.original().unwrap().pixel(0, 0)[3], 255);

        // Chained resize keeps the transparency
        session.resize(&ResizeSpec::new(32, 32)).unwrap();
        assert_eq!(session.current().unwrap().pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_explicit_reference_color() {
        let mut session = loaded_session(16, 16);
        let spec = BackgroundRemovalSpec::new([220, 20, 20], 1);
        let info = session.remove_background_with(&spec).unwrap();
        assert_eq!(info.removed_pixels, Some(64));
        assert_eq!(session.current().unwrap().pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_convert_sets_download_format() {
        let mut session = loaded_session(20, 10);
        session.remove_background(None).unwrap();

        let info = session.convert(OutputFormat::Jpeg).unwrap();
        assert_eq!(info.format, OutputFormat::Jpeg);
        assert_eq!(info.current_size, (20, 10));
        // JPEG has no alpha, everything is opaque again
        assert_eq!(session.current().unwrap().transparent_pixels(), 0);
        // Removed background comes back as the black matte, not white
        let corner = session.current().unwrap().pixel(0, 0);
        assert!(corner[..3].iter().all(|&c| c <= 64), "corner was {:?}", corner);

        let file = session.export().unwrap();
        assert!(file.filename.starts_with("edited-image-"));
        assert!(file.filename.ends_with(".jpg"));
        assert_eq!(image::guess_format(&file.bytes).unwrap(), image::ImageFormat::Jpeg);

        // Any further edit goes back to PNG
        session.resize(&ResizeSpec::new(10, 5)).unwrap();
        assert!(session.export().unwrap().filename.ends_with(".png"));
    }

    #[test]
    fn test_jpeg_matte_from_settings() {
        let mut session = EditorSession::new(EditorSettings {
            jpeg_matte: [0, 0, 255],
            ..EditorSettings::default()
        });
        session.install(sprite(32, 32));
        session.remove_background(None).unwrap();
        session.convert(OutputFormat::Jpeg).unwrap();

        let [r, g, b, a] = session.current().unwrap().pixel(0, 0);
        assert_eq!(a, 255);
        assert!(r <= 64 && g <= 64 && b >= 191, "corner was {:?}", [r, g, b]);
    }

    #[test]
    fn test_lossless_convert_keeps_pixels() {
        let mut session = loaded_session(12, 12);
        session.remove_background(None).unwrap();
        let before = session.current().unwrap().clone();
        session.convert(OutputFormat::WebP).unwrap();
        assert_eq!(session.current().unwrap(), &before);
    }

    #[test]
    fn test_export_names_strictly_increase() {
        let mut session = loaded_session(4, 4);
        let stamps: Vec<i64> = (0..5)
            .map(|_| {
                let name = session.export().unwrap().filename;
                name.trim_start_matches("edited-image-")
                    .trim_end_matches(".png")
                    .parse()
                    .unwrap()
            })
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_export_png_matches_current() {
        let mut session = loaded_session(9, 7);
        session.remove_background(Some(50)).unwrap();
        let file = session.export().unwrap();
        let decoded = image::load_from_memory(&file.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), session.current().unwrap().as_raw());
    }

    #[test]
    fn test_export_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = loaded_session(5, 5);
        let path = session.export_to_dir(&dir.path().join("downloads")).unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "png");
    }

    #[test]
    fn test_reset() {
        let mut session = loaded_session(30, 20);
        session.resize(&ResizeSpec::new(3, 2)).unwrap();
        session.convert(OutputFormat::Jpeg).unwrap();

        let info = session.reset().unwrap();
        assert_eq!(info.current_size, (30, 20));
        assert_eq!(info.format, OutputFormat::Png);
        assert_eq!(session.current(), session.original());
    }

    #[tokio::test]
    async fn test_load_bytes() {
        let png = encoder::encode_png(&sprite(200, 100)).unwrap();
        let mut session = EditorSession::default();
        let info = session.load(png).await.unwrap();
        assert_eq!(info.original_size, (200, 100));
        assert_eq!(info.original_preview, (200, 100));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_image() {
        let mut session = loaded_session(10, 10);
        let result = session.load(b"GIF? no".to_vec()).await;
        assert!(matches!(result, Err(EditorError::UnsupportedFileType(_))));
        assert_eq!(session.current().unwrap().dimensions(), (10, 10));
    }
}
