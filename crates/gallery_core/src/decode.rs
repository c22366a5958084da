//! Image decoding seam
//!
//! The cache treats decoding as an opaque capability: anything that can turn
//! a file path into an immutable [`DecodedImage`] works. [`FileDecoder`] is
//! the default implementation, backed by the `image` crate.

use crate::GalleryError;
use image::{GenericImageView, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Pixel layout of a decoded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
}

/// Decoded image in RAM
///
/// Immutable once constructed; shared between the cache and its consumers as
/// `Arc<DecodedImage>`.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

impl DecodedImage {
    /// Size of the pixel buffer in bytes
    pub fn mem_size(&self) -> usize {
        self.data.len()
    }
}

/// Anything that can decode an image file into pixels
///
/// Implementations must be callable from blocking worker threads. Supported
/// source formats are a property of the decoder, not of the cache.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedImage, GalleryError>;
}

/// Default decoder backed by the `image` crate
pub struct FileDecoder {
    /// Downscale decoded images to fit within these bounds (mosaic panes
    /// rarely need full resolution)
    max_size: Option<(u32, u32)>,
}

impl FileDecoder {
    /// Create a decoder that keeps images at their original resolution
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Create a decoder that downscales anything larger than `max_w` x `max_h`
    pub fn with_max_size(max_w: u32, max_h: u32) -> Self {
        Self {
            max_size: Some((max_w, max_h)),
        }
    }
}

impl Default for FileDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, GalleryError> {
        tracing::debug!("Decoding image: {}", path.display());

        // Read file
        let data = std::fs::read(path)?;

        // Decode image
        let reader = ImageReader::new(Cursor::new(&data)).with_guessed_format()?;
        let img = reader.decode()?;

        // Downscale if needed
        let img = if let Some((max_w, max_h)) = self.max_size {
            let (w, h) = img.dimensions();
            if w > max_w || h > max_h {
                img.thumbnail(max_w, max_h)
            } else {
                img
            }
        } else {
            img
        };

        // Convert to RGBA8
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(DecodedImage {
            width,
            height,
            data: rgba.into_raw(),
            format: PixelFormat::Rgba8,
        })
    }
}

/// Get image dimensions without fully decoding
pub fn image_dimensions(path: &Path) -> Result<(u32, u32), GalleryError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    Ok(reader.into_dimensions()?)
}

/// Check if a file has an extension the default decoder handles
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            matches!(
                e.to_lowercase().as_str(),
                "jpg" | "jpeg" | "png" | "gif" | "webp" | "bmp"
            )
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn temp_image_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("gallery_decode_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("test.jpg")));
        assert!(is_supported_image(Path::new("test.PNG")));
        assert!(is_supported_image(Path::new("test.WebP")));
        assert!(!is_supported_image(Path::new("test.txt")));
        assert!(!is_supported_image(Path::new("test.mp4")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn test_decode_png() {
        let dir = temp_image_dir("png");
        let path = dir.join("red.png");
        RgbaImage::from_pixel(2, 3, Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let decoded = FileDecoder::new().decode(&path).unwrap();
        assert_eq!(decoded.width, 2);
        assert_eq!(decoded.height, 3);
        assert_eq!(decoded.format, PixelFormat::Rgba8);
        assert_eq!(decoded.mem_size(), 2 * 3 * 4);
        assert_eq!(&decoded.data[0..4], &[255, 0, 0, 255]);

        std::fs::remove_file(&path).unwrap();
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn test_decode_downscales_to_max_size() {
        let dir = temp_image_dir("scale");
        let path = dir.join("big.png");
        RgbaImage::from_pixel(64, 64, Rgba([0, 255, 0, 255]))
            .save(&path)
            .unwrap();

        let decoded = FileDecoder::with_max_size(16, 16).decode(&path).unwrap();
        assert!(decoded.width <= 16 && decoded.height <= 16);

        std::fs::remove_file(&path).unwrap();
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn test_image_dimensions_without_full_decode() {
        let dir = temp_image_dir("dims");
        let path = dir.join("wide.png");
        RgbaImage::from_pixel(7, 2, Rgba([0, 0, 255, 255]))
            .save(&path)
            .unwrap();

        assert_eq!(image_dimensions(&path).unwrap(), (7, 2));

        std::fs::remove_file(&path).unwrap();
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn test_decode_missing_file_is_io_error() {
        let err = FileDecoder::new()
            .decode(Path::new("/nonexistent/missing.png"))
            .unwrap_err();
        assert!(matches!(err, GalleryError::Io(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let dir = temp_image_dir("garbage");
        let path = dir.join("bad.png");
        std::fs::write(&path, b"not an image at all").unwrap();

        let err = FileDecoder::new().decode(&path).unwrap_err();
        assert!(matches!(err, GalleryError::ImageDecode(_)));

        std::fs::remove_file(&path).unwrap();
        let _ = std::fs::remove_dir(&dir);
    }
}
