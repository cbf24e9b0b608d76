//! Resize with optional aspect-ratio lock
//!
//! The lock always derives from the ratio of the image as it was loaded,
//! not from whatever the last resize produced. Re-deriving from a resized
//! bitmap would let rounding errors pile up across repeated resizes.

use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};
use crate::bitmap::Bitmap;
use crate::error::{EditorError, Result};

// ============================================================================
// SETTINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Lanczos3,
}

impl Interpolation {
    pub fn to_filter(self) -> FilterType {
        match self {
            Interpolation::Nearest => FilterType::Nearest,
            Interpolation::Bilinear => FilterType::Triangle,
            Interpolation::Bicubic => FilterType::CatmullRom,
            Interpolation::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Width:height of the original image, captured once at load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EditorError::InvalidDimension(format!(
                "Aspect ratio needs positive sides, got {}x{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn of(bitmap: &Bitmap) -> Self {
        // Bitmap dimensions are positive by construction
        Self {
            width: bitmap.width(),
            height: bitmap.height(),
        }
    }

    /// `round(H0 * width / W0)`, at least 1
    pub fn height_for_width(&self, width: u32) -> u32 {
        scale_rounded(self.height, width, self.width)
    }

    /// `round(W0 * height / H0)`, at least 1
    pub fn width_for_height(&self, height: u32) -> u32 {
        scale_rounded(self.width, height, self.height)
    }
}

/// `round(value * num / den)` in integer math, halves rounded up
fn scale_rounded(value: u32, num: u32, den: u32) -> u32 {
    let scaled = (2 * value as u64 * num as u64 + den as u64) / (2 * den as u64);
    scaled.clamp(1, u32::MAX as u64) as u32
}

/// Requested output size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub target_width: u32,
    pub target_height: u32,
    pub lock_aspect_ratio: bool,
}

impl ResizeSpec {
    /// Free resize to exactly `width` x `height`
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target_width: width,
            target_height: height,
            lock_aspect_ratio: false,
        }
    }

    /// Locked resize driven by the width
    pub fn locked_to_width(aspect: &AspectRatio, width: u32) -> Self {
        Self {
            target_width: width,
            target_height: aspect.height_for_width(width),
            lock_aspect_ratio: true,
        }
    }

    /// Locked resize driven by the height
    pub fn locked_to_height(aspect: &AspectRatio, height: u32) -> Self {
        Self {
            target_width: aspect.width_for_height(height),
            target_height: height,
            lock_aspect_ratio: true,
        }
    }

    /// Width field edited; height follows when locked
    pub fn set_width(&mut self, width: u32, aspect: &AspectRatio) {
        self.target_width = width;
        if self.lock_aspect_ratio && width > 0 {
            self.target_height = aspect.height_for_width(width);
        }
    }

    /// Height field edited; width follows when locked
    pub fn set_height(&mut self, height: u32, aspect: &AspectRatio) {
        self.target_height = height;
        if self.lock_aspect_ratio && height > 0 {
            self.target_width = aspect.width_for_height(height);
        }
    }

    /// Make a locked spec agree with the original aspect ratio
    ///
    /// A spec already produced by either derivation (width-driven or
    /// height-driven) is kept as-is. Anything else is re-derived from the
    /// width. Unlocked specs pass through untouched.
    pub fn reconciled(&self, aspect: &AspectRatio) -> Self {
        if !self.lock_aspect_ratio || self.target_width == 0 {
            return *self;
        }
        if self.target_height > 0
            && (self.target_height == aspect.height_for_width(self.target_width)
                || self.target_width == aspect.width_for_height(self.target_height))
        {
            return *self;
        }
        Self::locked_to_width(aspect, self.target_width)
    }

    pub fn validate(&self, max_dimension: u32) -> Result<()> {
        for (name, value) in [("width", self.target_width), ("height", self.target_height)] {
            if value == 0 {
                return Err(EditorError::InvalidDimension(format!(
                    "Target {} must be a positive integer",
                    name
                )));
            }
            if value > max_dimension {
                return Err(EditorError::InvalidDimension(format!(
                    "Target {} {} exceeds the limit of {}",
                    name, value, max_dimension
                )));
            }
        }
        Ok(())
    }
}

/// Parse a width/height form value
pub fn parse_dimension(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    let value: i64 = trimmed.parse().map_err(|_| {
        EditorError::InvalidDimension(format!("'{}' is not a whole number", trimmed))
    })?;

    if value <= 0 {
        return Err(EditorError::InvalidDimension(format!(
            "{} is not a positive size",
            value
        )));
    }

    u32::try_from(value)
        .map_err(|_| EditorError::InvalidDimension(format!("{} is too large", value)))
}

// ============================================================================
// RESAMPLING
// ============================================================================

/// Scale `source` to the size in `spec`
///
/// The output is always exactly `target_width` x `target_height`. Only zero
/// targets are rejected here; the session applies the configured size cap.
pub fn resample(source: &Bitmap, spec: &ResizeSpec, interpolation: Interpolation) -> Result<Bitmap> {
    spec.validate(u32::MAX)?;

    let (width, height) = (spec.target_width, spec.target_height);
    if (width, height) == source.dimensions() {
        return Ok(source.clone());
    }

    let resized = imageops::resize(source.as_image(), width, height, interpolation.to_filter());
    log::debug!(
        "Resampled {}x{} -> {}x{} ({:?})",
        source.width(),
        source.height(),
        width,
        height,
        interpolation
    );
    Bitmap::from_image(resized)
}

// ============================================================================
// TESTS
// ============================================================================
