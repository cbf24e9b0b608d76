//! Color-key background removal
//!
//! Pixels whose color is close to a reference color become fully
//! transparent. Closeness is the Manhattan distance in RGB (sum of absolute
//! channel differences, alpha ignored), which needs no multiply or sqrt per
//! pixel.
//!
//! This is a naive heuristic, not segmentation: there is no edge detection,
//! no flood fill and no matting. Foreground pixels that happen to match the
//! background color are removed too, wherever they are in the image.

use serde::{Deserialize, Serialize};
use crate::bitmap::{Bitmap, CHANNELS};
use crate::error::Result;
use crate::settings::DEFAULT_BACKGROUND_THRESHOLD;

/// Largest possible Manhattan distance between two RGB colors
pub const MAX_RGB_DISTANCE: u32 = 255 * 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundRemovalSpec {
    /// Color treated as background
    pub reference_color: [u8; 3],
    /// Pixels with distance strictly below this are cleared (default: 100)
    pub threshold: u32,
}

impl BackgroundRemovalSpec {
    pub fn new(reference_color: [u8; 3], threshold: u32) -> Self {
        Self {
            reference_color,
            threshold,
        }
    }

    /// Use the top-left pixel of `source` as the background color
    pub fn from_corner(source: &Bitmap, threshold: u32) -> Self {
        Self::new(corner_color(source), threshold)
    }
}

impl Default for BackgroundRemovalSpec {
    fn default() -> Self {
        Self::new([255, 255, 255], DEFAULT_BACKGROUND_THRESHOLD)
    }
}

/// Result from background removal
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalResult {
    pub bitmap: Bitmap,
    /// Pixels whose alpha was set to 0 by this call
    pub removed_pixels: usize,
}

/// RGB of pixel (0, 0)
pub fn corner_color(source: &Bitmap) -> [u8; 3] {
    let [r, g, b, _] = source.pixel(0, 0);
    [r, g, b]
}

/// RGB color distance (sum of absolute differences)
pub fn rgb_color_distance(c1: &[u8; 3], c2: &[u8; 3]) -> u32 {
    c1[0].abs_diff(c2[0]) as u32 + c1[1].abs_diff(c2[1]) as u32 + c1[2].abs_diff(c2[2]) as u32
}

/// Clear alpha on every pixel close to the reference color
///
/// Returns a new bitmap of the same size. RGB values are never changed, and
/// pixels at or beyond the threshold are copied byte for byte.
pub fn remove_background(source: &Bitmap, spec: &BackgroundRemovalSpec) -> Result<RemovalResult> {
    let (width, height) = source.dimensions();
    let mut data = source.as_raw().to_vec();
    let mut removed_pixels = 0usize;

    for pixel in data.chunks_exact_mut(CHANNELS) {
        let rgb = [pixel[0], pixel[1], pixel[2]];
        if rgb_color_distance(&rgb, &spec.reference_color) < spec.threshold {
            if pixel[3] != 0 {
                removed_pixels += 1;
            }
            pixel[3] = 0;
        }
    }

    log::debug!(
        "Background removal: reference {:?}, threshold {}, cleared {} of {} pixels",
        spec.reference_color,
        spec.threshold,
        removed_pixels,
        width as usize * height as usize
    );

    Ok(RemovalResult {
        bitmap: Bitmap::from_raw(width, height, data)?,
        removed_pixels,
    })
}

// ============================================================================
// TESTS
// ============================================================================
