//! LightningGallery Core Engine
//!
//! This crate contains:
//! - Image catalog (ordered index to path registry)
//! - Bounded image cache with sliding-window prefetch/eviction
//! - Decode seam and the default file decoder
//! - Folder scanning
//! - Viewer navigation
//! - Configuration
//! - Error types

pub mod catalog;
pub mod cache;
pub mod decode;
pub mod scan;
pub mod navigation;
pub mod config;
pub mod error;

pub use catalog::Catalog;
pub use cache::{CacheStats, ImageCache};
pub use decode::{
    image_dimensions, is_supported_image, DecodedImage, FileDecoder, ImageDecoder, PixelFormat,
};
pub use scan::{scan_folder, scan_folder_with};
pub use navigation::Navigator;
pub use config::{CacheConfig, GalleryConfig, ScanConfig};
pub use error::GalleryError;
