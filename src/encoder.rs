//! Bitmap → container bytes
//!
//! A pass-through to the `image` codecs. PNG and WebP are written lossless
//! with alpha. JPEG cannot carry alpha, so the bitmap is composited onto an
//! opaque matte color first (black by default, like a browser canvas) and
//! the codec's lossy compression is accepted as-is. Pixels cleared by
//! background removal therefore come out as the matte, not their old RGB.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::bitmap::Bitmap;
use crate::error::{EditorError, Result};

/// Background that transparent pixels are blended onto for JPEG
pub const DEFAULT_MATTE: [u8; 3] = [0, 0, 0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
        }
    }

    pub fn is_lossy(self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = EditorError;

    /// Accepts `png`, `jpeg`/`jpg`, `webp`, with or without an `image/` prefix
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_prefix("image/").unwrap_or(&name);
        match name {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::WebP),
            other => Err(EditorError::EncodeFailure(format!(
                "Unsupported output format '{}'",
                other
            ))),
        }
    }
}

/// Encode `source` in `format`; `jpeg_quality` is ignored for lossless formats
pub fn encode(source: &Bitmap, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    encode_with_matte(source, format, jpeg_quality, DEFAULT_MATTE)
}

/// Like `encode`, with the JPEG background color chosen by the caller
pub fn encode_with_matte(
    source: &Bitmap,
    format: OutputFormat,
    jpeg_quality: u8,
    matte: [u8; 3],
) -> Result<Vec<u8>> {
    let (width, height) = source.dimensions();
    let mut buffer = Vec::new();

    let written = match format {
        OutputFormat::Png => PngEncoder::new(&mut buffer).write_image(
            source.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        OutputFormat::Jpeg => {
            let rgb = flatten_onto(source, matte);
            JpegEncoder::new_with_quality(&mut buffer, jpeg_quality.clamp(1, 100)).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        OutputFormat::WebP => WebPEncoder::new_lossless(&mut buffer).write_image(
            source.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };

    written.map_err(|e| EditorError::EncodeFailure(format!("Failed to encode {}: {}", format, e)))?;

    log::debug!("Encoded {}x{} as {} ({} bytes)", width, height, format, buffer.len());
    Ok(buffer)
}

/// Composite `source` over an opaque `matte`, dropping alpha
pub fn flatten_onto(source: &Bitmap, matte: [u8; 3]) -> RgbImage {
    let image = source.as_image();
    RgbImage::from_fn(source.width(), source.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let blend = |c: u8, m: u8| {
            let (c, m, a) = (c as u32, m as u32, a as u32);
            ((c * a + m * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r, matte[0]), blend(g, matte[1]), blend(b, matte[2])])
    })
}

/// Encode image as PNG bytes (for preview/transfer without file I/O)
pub fn encode_png(source: &Bitmap) -> Result<Vec<u8>> {
    encode(source, OutputFormat::Png, 100)
}

/// `edited-image-<timestamp>.<ext>`
pub fn download_filename(format: OutputFormat, timestamp_millis: i64) -> String {
    format!("edited-image-{}.{}", timestamp_millis, format.extension())
}

/// An encoded image ready to be saved under `filename`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadFile {
    pub filename: String,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

// ============================================================================
// TESTS
// ============================================================================
