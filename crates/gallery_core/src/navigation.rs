//! Viewer position and multi-pane paging over the image cache

use crate::cache::ImageCache;
use crate::decode::DecodedImage;
use crate::scan::scan_folder;
use crate::GalleryError;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;

/// Paging cursor over a cache's catalog
///
/// Moves in steps of `pane_count` (the number of images shown side by
/// side), wrapping past either end of the catalog. Owns a handle to the
/// shared [`ImageCache`]; clone the cache to share it elsewhere.
pub struct Navigator {
    cache: ImageCache,
    position: usize,
    pane_count: usize,
}

impl Navigator {
    pub fn new(cache: ImageCache) -> Self {
        Self {
            cache,
            position: 0,
            pane_count: 1,
        }
    }

    pub fn with_pane_count(cache: ImageCache, panes: usize) -> Self {
        let mut nav = Self::new(cache);
        nav.set_pane_count(panes);
        nav
    }

    /// Scan a folder into the catalog and reset to the first image
    ///
    /// Returns the number of images found. The previous catalog and every
    /// cached entry are dropped even if the new folder is empty.
    pub fn open_folder<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize, GalleryError> {
        let paths = scan_folder(dir)?;
        let count = paths.len();
        self.cache.initialize(paths);
        self.position = 0;
        tracing::info!(count, "opened folder");
        Ok(count)
    }

    /// Move forward one page, wrapping past the last image
    pub fn advance(&mut self) -> usize {
        let len = self.cache.count();
        if len > 0 {
            // Reduce the step first so the sum cannot overflow
            let step = self.pane_count % len;
            self.position = (self.position + step) % len;
        }
        self.position
    }

    /// Move back one page, wrapping past the first image
    pub fn retreat(&mut self) -> usize {
        let len = self.cache.count();
        if len > 0 {
            let step = self.pane_count % len;
            self.position = (self.position + len - step) % len;
        }
        self.position
    }

    /// Jump to an absolute position, clamped to the catalog
    pub fn jump(&mut self, index: usize) -> usize {
        let max = self.cache.count().saturating_sub(1);
        self.position = index.min(max);
        self.position
    }

    pub fn first(&mut self) -> usize {
        self.jump(0)
    }

    pub fn last(&mut self) -> usize {
        let max = self.cache.count().saturating_sub(1);
        self.jump(max)
    }

    /// Shuffle the catalog and restart from the front
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cache.shuffle(rng);
        self.position = 0;
    }

    /// Images for the visible panes, warming the window in the background
    ///
    /// Fetches `pane_count` images starting at the current position,
    /// wrapping past the end, then kicks off a detached preload around the
    /// position. Decode failures shorten the result.
    pub async fn current_view(&self) -> Vec<Arc<DecodedImage>> {
        let images = self.cache.get_images(self.position, self.pane_count).await;
        self.cache.spawn_preload(self.position, self.pane_count);
        images
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn pane_count(&self) -> usize {
        self.pane_count
    }

    /// Change how many images are shown per page; at least one
    pub fn set_pane_count(&mut self, panes: usize) {
        self.pane_count = panes.max(1);
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::decode::{FileDecoder, ImageDecoder, PixelFormat};
    use image::{Rgba, RgbaImage};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::path::PathBuf;

    /// Synthesizes a 1x1 image whose first byte is the numeric file stem
    struct StubDecoder;

    impl ImageDecoder for StubDecoder {
        fn decode(&self, path: &Path) -> Result<DecodedImage, GalleryError> {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| GalleryError::ImageDecode("bad stem".into()))?;
            Ok(DecodedImage {
                width: 1,
                height: 1,
                data: vec![(stem % 256) as u8, 0, 0, 255],
                format: PixelFormat::Rgba8,
            })
        }
    }

    fn test_navigator(catalog_size: usize, panes: usize) -> Navigator {
        let config = CacheConfig {
            capacity: 64,
            preload_ahead: 5,
            keep_behind: 3,
        };
        let cache = ImageCache::new(config, Arc::new(StubDecoder)).unwrap();
        let paths: Vec<PathBuf> = (0..catalog_size)
            .map(|i| PathBuf::from(format!("/virtual/{}.png", i)))
            .collect();
        cache.initialize(paths);
        Navigator::with_pane_count(cache, panes)
    }

    #[test]
    fn test_advance_wraps_past_end() {
        let mut nav = test_navigator(10, 1);
        nav.jump(9);
        assert_eq!(nav.advance(), 0);

        let mut nav = test_navigator(10, 3);
        assert_eq!(nav.advance(), 3);
        assert_eq!(nav.advance(), 6);
        assert_eq!(nav.advance(), 9);
        assert_eq!(nav.advance(), 2);
    }

    #[test]
    fn test_retreat_wraps_past_start() {
        let mut nav = test_navigator(10, 3);
        assert_eq!(nav.retreat(), 7);
        assert_eq!(nav.retreat(), 4);

        let mut nav = test_navigator(10, 1);
        assert_eq!(nav.retreat(), 9);
    }

    #[test]
    fn test_jump_clamps() {
        let mut nav = test_navigator(10, 1);
        assert_eq!(nav.jump(100), 9);
        assert_eq!(nav.jump(5), 5);
        assert_eq!(nav.first(), 0);
        assert_eq!(nav.last(), 9);
    }

    #[test]
    fn test_empty_catalog_stays_put() {
        let mut nav = test_navigator(0, 1);
        assert_eq!(nav.advance(), 0);
        assert_eq!(nav.retreat(), 0);
        assert_eq!(nav.jump(5), 0);
    }

    #[test]
    fn test_pane_count_at_least_one() {
        let mut nav = test_navigator(10, 1);
        nav.set_pane_count(0);
        assert_eq!(nav.pane_count(), 1);
        nav.set_pane_count(4);
        assert_eq!(nav.pane_count(), 4);
    }

    #[test]
    fn test_huge_pane_count_steps_exactly() {
        // usize::MAX % 10 == 5, so each step moves five forward
        let mut nav = test_navigator(10, 1);
        nav.set_pane_count(usize::MAX);
        assert_eq!(nav.advance(), 5);
        assert_eq!(nav.advance(), 0);
        assert_eq!(nav.retreat(), 5);
    }

    #[test]
    fn test_shuffle_resets_position() {
        let mut nav = test_navigator(10, 1);
        nav.jump(5);

        let mut rng = StdRng::seed_from_u64(3);
        nav.shuffle(&mut rng);

        assert_eq!(nav.position(), 0);
        assert_eq!(nav.cache().cached_count(), 0);
        assert_eq!(nav.cache().count(), 10);
    }

    #[tokio::test]
    async fn test_current_view_spans_wraparound() {
        let mut nav = test_navigator(10, 4);
        nav.jump(8);

        let images = nav.current_view().await;
        let stems: Vec<u8> = images.iter().map(|i| i.data[0]).collect();
        assert_eq!(stems, vec![8, 9, 0, 1]);
    }

    #[tokio::test]
    async fn test_current_view_empty_catalog() {
        let nav = test_navigator(0, 4);
        assert!(nav.current_view().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_folder_end_to_end() {
        let dir = std::env::temp_dir().join(format!("gallery_nav_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        // Named so lexicographic and natural order disagree
        for stem in [1, 2, 10, 11] {
            let path = dir.join(format!("{}.png", stem));
            RgbaImage::from_pixel(1, 1, Rgba([stem as u8, 0, 0, 255]))
                .save(&path)
                .unwrap();
        }

        let config = CacheConfig {
            capacity: 8,
            preload_ahead: 2,
            keep_behind: 1,
        };
        let cache = ImageCache::new(config, Arc::new(FileDecoder::new())).unwrap();
        let mut nav = Navigator::with_pane_count(cache, 2);

        let count = nav.open_folder(&dir).unwrap();
        assert_eq!(count, 4);
        assert_eq!(nav.cache().file_name(0), Some("1.png".to_string()));
        assert_eq!(nav.cache().file_name(2), Some("10.png".to_string()));

        let view = nav.current_view().await;
        assert_eq!(view.len(), 2);

        nav.advance();
        assert_eq!(nav.position(), 2);
        let view = nav.current_view().await;
        assert_eq!(view.len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
