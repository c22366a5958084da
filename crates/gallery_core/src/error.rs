//! Engine error types

use thiserror::Error;

/// Main engine error type
#[derive(Error, Debug)]
pub enum GalleryError {
    // ===== Recoverable (log, skip the affected image, continue) =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ===== Fatal (construction/configuration mistakes) =====
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GalleryError {
    /// Is this error recoverable?
    ///
    /// Recoverable errors affect a single image; the viewer keeps running
    /// and the index is retried on next access.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GalleryError::Io(_) | GalleryError::ImageDecode(_) | GalleryError::UnsupportedFormat(_)
        )
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            GalleryError::ImageDecode(msg) => format!("Cannot load image: {}", msg),
            GalleryError::UnsupportedFormat(ext) => format!("Unsupported format: {}", ext),
            _ => self.to_string(),
        }
    }
}

impl From<image::ImageError> for GalleryError {
    fn from(e: image::ImageError) -> Self {
        GalleryError::ImageDecode(e.to_string())
    }
}
