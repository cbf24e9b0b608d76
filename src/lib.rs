//! Image editing core: resize, format conversion and background removal.
//!
//! The transformations (`resample`, `background`, `encoder`) are stateless
//! functions over [`Bitmap`]. [`EditorSession`] keeps the original and the
//! current image between operations for a front end. With the `desktop`
//! feature, `commands` exposes the session to a tauri webview.

pub mod background;
pub mod bitmap;
pub mod encoder;
pub mod error;
pub mod loader;
pub mod resample;
pub mod session;
pub mod settings;

#[cfg(feature = "desktop")]
pub mod commands;

pub use background::{remove_background, BackgroundRemovalSpec, RemovalResult};
pub use bitmap::Bitmap;
pub use encoder::{encode, DownloadFile, OutputFormat};
pub use error::{EditorError, Result};
pub use resample::{resample, AspectRatio, Interpolation, ResizeSpec};
pub use session::{EditorSession, ImageInfo};
pub use settings::EditorSettings;
