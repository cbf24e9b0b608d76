use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;

impl EditorError {
    /// Shorthand for the notice shown when an action needs an image first
    pub fn no_image() -> Self {
        EditorError::InvalidInput("Please upload an image first".to_string())
    }
}

// Implement Serialize for Tauri error responses
impl serde::Serialize for EditorError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
