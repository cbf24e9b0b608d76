//! Upload decoding
//!
//! Turning an uploaded byte stream into a `Bitmap` is the only asynchronous
//! step in the editor. The decode runs on tokio's blocking pool and resolves
//! once: either a complete bitmap or an error, never a partially decoded one.

use std::path::Path;
use crate::bitmap::Bitmap;
use crate::error::{EditorError, Result};

/// Reject uploads whose declared MIME type isn't an image
pub fn check_mime_type(mime: &str) -> Result<()> {
    if mime.trim().to_ascii_lowercase().starts_with("image/") {
        Ok(())
    } else {
        Err(EditorError::UnsupportedFileType(format!(
            "Please upload image files only (got {})",
            mime
        )))
    }
}

/// Decode raw file bytes into a bitmap
///
/// The container is sniffed from the leading bytes before any decoding, so
/// arbitrary data is rejected without allocating pixel buffers.
pub fn decode(bytes: &[u8]) -> Result<Bitmap> {
    let format = image::guess_format(bytes).map_err(|_| {
        EditorError::UnsupportedFileType("Please upload image files only".to_string())
    })?;

    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        EditorError::UnsupportedFileType(format!("Could not decode {:?} image: {}", format, e))
    })?;

    let bitmap = Bitmap::from_image(img.to_rgba8()).map_err(|_| {
        EditorError::UnsupportedFileType("Image has no pixels".to_string())
    })?;

    log::info!(
        "Decoded {:?} image {}x{} ({} bytes)",
        format,
        bitmap.width(),
        bitmap.height(),
        bytes.len()
    );
    Ok(bitmap)
}

/// Decode on the blocking pool
pub async fn load(bytes: Vec<u8>) -> Result<Bitmap> {
    tokio::task::spawn_blocking(move || decode(&bytes))
        .await
        .map_err(|e| EditorError::Processing(format!("Task join error: {}", e)))?
}

/// Read a file from disk and decode it
pub async fn load_file(path: &Path) -> Result<Bitmap> {
    let bytes = tokio::fs::read(path).await?;
    load(bytes).await
}

// ============================================================================
// TESTS
// ============================================================================
