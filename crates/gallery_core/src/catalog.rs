//! Image catalog - the ordered index to path registry
//!
//! Single source of truth for "what images exist and in what order". Indices
//! are dense and zero-based; any mutation (initialize, shuffle) leaves the
//! index domain at exactly `[0, len)`.

use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Ordered list of image paths, addressed by dense index
#[derive(Debug, Default)]
pub struct Catalog {
    paths: Vec<PathBuf>,
}

impl Catalog {
    pub fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Replace the entire index space with the given paths, in order
    ///
    /// Indices are reassigned `0..len`. An empty list yields an empty
    /// catalog. Callers holding a cache keyed by the old indices must clear
    /// it; [`crate::ImageCache`] does this automatically.
    pub fn initialize(&mut self, paths: Vec<PathBuf>) {
        tracing::debug!(count = paths.len(), "catalog initialized");
        self.paths = paths;
    }

    /// Reorder the catalog in place with a Fisher-Yates shuffle
    ///
    /// Indices are reassigned to the new order. No-op when fewer than two
    /// entries exist. Index to path bindings change, so any cache keyed by
    /// the old indices is invalid afterwards.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.paths.len() <= 1 {
            return;
        }
        self.paths.shuffle(rng);
        tracing::debug!(count = self.paths.len(), "catalog shuffled");
    }

    /// Path for a valid index, `None` otherwise
    ///
    /// Out-of-range requests happen transiently while the catalog is being
    /// swapped under a navigating UI; they are absence, not an error.
    pub fn path(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(|p| p.as_path())
    }

    /// Filename component for a valid index, `None` otherwise
    pub fn file_name(&self, index: usize) -> Option<String> {
        self.path(index)
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
    }

    /// Current number of entries
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
