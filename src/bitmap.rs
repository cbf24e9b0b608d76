//! In-memory RGBA bitmap shared by every transformation.
//!
//! A `Bitmap` is a thin wrapper over `image::RgbaImage` that guarantees the
//! dimensions are positive, so buffer length is always `width * height * 4`.
//! Transformations take `&Bitmap` and hand back a new one; nothing mutates
//! the caller's copy.

use image::{Rgba, RgbaImage};
use crate::error::{EditorError, Result};

/// Bytes per RGBA pixel
pub const CHANNELS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    image: RgbaImage,
}

impl Bitmap {
    /// Build a bitmap from a raw row-major RGBA buffer
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height)?;

        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(EditorError::InvalidInput(format!(
                "Pixel buffer holds {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }

        let image = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            EditorError::InvalidInput(format!("Malformed {}x{} pixel buffer", width, height))
        })?;
        Ok(Self { image })
    }

    /// Wrap an already decoded image
    pub fn from_image(image: RgbaImage) -> Result<Self> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    /// Bitmap filled with a single color
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            image: RgbaImage::from_pixel(width, height, Rgba(color)),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// RGBA at `(x, y)`
    ///
    /// # Panics
    ///
    /// If `(x, y)` is outside the bitmap. Use `get_pixel` for untrusted
    /// coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// RGBA at `(x, y)`, or `None` outside the bitmap
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Raw RGBA bytes, row-major from the top-left corner
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.image.into_raw()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Number of fully transparent pixels
    pub fn transparent_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p[3] == 0).count()
    }

    /// Size to draw this bitmap at when the preview is capped at `max_width`
    pub fn preview_size(&self, max_width: u32) -> (u32, u32) {
        preview_size(self.width(), self.height(), max_width)
    }
}

/// Scale `(width, height)` down so the width fits in `max_width`.
///
/// Images narrower than the cap keep their size. Height follows the source
/// aspect ratio and never drops below one pixel.
pub fn preview_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let preview_width = width.min(max_width.max(1));
    if preview_width == width {
        return (width, height);
    }

    let preview_height = (height as f64 * preview_width as f64 / width as f64).round() as u32;
    (preview_width, preview_height.max(1))
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(EditorError::InvalidDimension(format!(
            "Bitmap must have positive size, got {}x{}",
            width, height
        )));
    }
    Ok(())
}
