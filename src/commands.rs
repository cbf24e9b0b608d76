//! Tauri commands for the webview front end
//!
//! Each button in the UI maps to one command. The session lives in tauri's
//! managed state behind an async mutex, so one command runs against it at a
//! time. Errors reach the front end as their display string.

use tauri::State;
use tokio::sync::Mutex;
use crate::encoder::{self, DownloadFile, OutputFormat};
use crate::error::{EditorError, Result};
use crate::loader;
use crate::resample::{self, ResizeSpec};
use crate::session::{EditorSession, ImageInfo};
use crate::settings::EditorSettings;

pub type SessionState = Mutex<EditorSession>;

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewTarget {
    Original,
    Current,
}

#[tauri::command]
async fn load_image_command(
    state: State<'_, SessionState>,
    bytes: Vec<u8>,
    mime_type: Option<String>,
) -> Result<ImageInfo> {
    if let Some(mime) = mime_type.as_deref() {
        loader::check_mime_type(mime)?;
    }

    // Decode before taking the lock; a failed upload never touches the session
    let bitmap = loader::load(bytes).await?;
    Ok(state.lock().await.install(bitmap))
}

#[tauri::command]
async fn resize_inputs_command(
    state: State<'_, SessionState>,
    width: Option<String>,
    height: Option<String>,
    lock_aspect_ratio: bool,
) -> Result<ResizeSpec> {
    let mut session = state.lock().await;
    let mut inputs = session.set_lock_aspect_ratio(lock_aspect_ratio)?;
    if let Some(width) = width {
        inputs = session.set_width(resample::parse_dimension(&width)?)?;
    } else if let Some(height) = height {
        inputs = session.set_height(resample::parse_dimension(&height)?)?;
    }
    Ok(inputs)
}

#[tauri::command]
async fn resize_image_command(
    state: State<'_, SessionState>,
    width: String,
    height: String,
    lock_aspect_ratio: bool,
) -> Result<ImageInfo> {
    let mut session = state.lock().await;
    if !session.is_loaded() {
        return Err(EditorError::no_image());
    }

    let spec = ResizeSpec {
        target_width: resample::parse_dimension(&width)?,
        target_height: resample::parse_dimension(&height)?,
        lock_aspect_ratio,
    };
    session.resize(&spec)
}

#[tauri::command]
async fn convert_format_command(state: State<'_, SessionState>, format: String) -> Result<ImageInfo> {
    let format: OutputFormat = format.parse()?;
    state.lock().await.convert(format)
}

#[tauri::command]
async fn remove_background_command(
    state: State<'_, SessionState>,
    threshold: Option<u32>,
) -> Result<ImageInfo> {
    state.lock().await.remove_background(threshold)
}

#[tauri::command]
async fn reset_image_command(state: State<'_, SessionState>) -> Result<ImageInfo> {
    state.lock().await.reset()
}

#[tauri::command]
async fn export_image_command(state: State<'_, SessionState>) -> Result<DownloadFile> {
    let mut session = state.lock().await;
    if !session.is_loaded() {
        return Err(EditorError::InvalidInput("No processed image to download".to_string()));
    }
    session.export()
}

#[tauri::command]
async fn preview_png_command(
    state: State<'_, SessionState>,
    target: PreviewTarget,
) -> Result<Vec<u8>> {
    let session = state.lock().await;
    let bitmap = match target {
        PreviewTarget::Original => session.original(),
        PreviewTarget::Current => session.current(),
    }
    .ok_or_else(EditorError::no_image)?;
    encoder::encode_png(bitmap)
}

/// Attach the editor session and its commands to a tauri app
pub fn register<R: tauri::Runtime>(
    builder: tauri::Builder<R>,
    settings: EditorSettings,
) -> tauri::Builder<R> {
    builder
        .manage(Mutex::new(EditorSession::new(settings)))
        .invoke_handler(tauri::generate_handler![
            load_image_command,
            resize_inputs_command,
            resize_image_command,
            convert_format_command,
            remove_background_command,
            reset_image_command,
            export_image_command,
            preview_png_command,
        ])
}
