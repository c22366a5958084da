//! Bounded image cache with sliding-window prefetch and eviction
//!
//! Decouples "which images exist" (the [`Catalog`]) from "which images are
//! materialized in memory" (a bounded working set), so memory stays flat no
//! matter how large the collection is:
//! - On-demand load with FIFO eviction at capacity
//! - Window preload around the current position, evicting everything outside
//! - Coalesced concurrent decodes per index
//!
//! All handles are clones of the same cache; clone freely and share across
//! the display path and background preload tasks.

use crate::catalog::Catalog;
use crate::config::CacheConfig;
use crate::decode::{DecodedImage, ImageDecoder};
use crate::GalleryError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

/// Result of one in-flight decode, fanned out to coalesced waiters
type LoadResult = Option<Arc<DecodedImage>>;

/// What to do when an insert finds the cache full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Evict the oldest entry to make room (on-demand loads)
    Evict,
    /// Drop the load instead (preload warm-up is best effort)
    BestEffort,
}

/// Monotonic telemetry counters
#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    decode_failures: AtomicU64,
}

/// Cache statistics snapshot
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub decode_failures: u64,
}

/// Bounded in-memory cache of decoded images, keyed by catalog index
///
/// Eviction is strictly insertion-order-oldest (FIFO): reading an entry does
/// not refresh it. At most `capacity` images are resident; the
/// check-evict-insert sequence is not atomic under concurrent admission, so
/// the bound may briefly overshoot by a small margin and self-corrects on the
/// next eviction pass.
#[derive(Clone)]
pub struct ImageCache {
    /// Index to path registry this cache projects
    catalog: Arc<RwLock<Catalog>>,

    /// Resident decoded images
    entries: Arc<DashMap<usize, Arc<DecodedImage>>>,

    /// Insertion order backing the FIFO eviction policy
    arrival: Arc<Mutex<VecDeque<usize>>>,

    /// In-flight decodes, keyed by (generation, index) so decodes started
    /// against an old catalog never coalesce with requests against a new one
    pending: Arc<DashMap<(u64, usize), broadcast::Sender<LoadResult>>>,

    /// Bumped by initialize/shuffle/clear; admission requires an unchanged
    /// generation so a catalog swap never leaves a stale index binding
    generation: Arc<AtomicU64>,

    counters: Arc<CacheCounters>,
    decoder: Arc<dyn ImageDecoder>,

    capacity: usize,
    preload_ahead: usize,
    keep_behind: usize,
}

impl ImageCache {
    /// Create an empty cache over an empty catalog
    ///
    /// `capacity` of zero is a configuration error; window parameters may be
    /// zero. Parameters are fixed for the cache's lifetime.
    pub fn new(config: CacheConfig, decoder: Arc<dyn ImageDecoder>) -> Result<Self, GalleryError> {
        config.validate()?;

        Ok(Self {
            catalog: Arc::new(RwLock::new(Catalog::new())),
            entries: Arc::new(DashMap::new()),
            arrival: Arc::new(Mutex::new(VecDeque::new())),
            pending: Arc::new(DashMap::new()),
            generation: Arc::new(AtomicU64::new(0)),
            counters: Arc::new(CacheCounters::default()),
            decoder,
            capacity: config.capacity,
            preload_ahead: config.preload_ahead,
            keep_behind: config.keep_behind,
        })
    }

    // ===== Catalog lifecycle =====

    /// Replace the catalog wholesale and drop every cached entry
    ///
    /// Indices are reassigned `0..paths.len()`; entries keyed by the old
    /// indices must never be served again, so the cache restarts cold.
    pub fn initialize(&self, paths: Vec<PathBuf>) {
        let mut catalog = self.catalog.write();
        catalog.initialize(paths);
        self.invalidate();
    }

    /// Shuffle the catalog and drop every cached entry
    ///
    /// Index to path bindings change under a shuffle, so every resident
    /// entry would point at the wrong path afterwards.
    pub fn shuffle<R: Rng + ?Sized>(&self, rng: &mut R) {
        let mut catalog = self.catalog.write();
        catalog.shuffle(rng);
        self.invalidate();
    }

    /// Drop every cached entry; the catalog is untouched
    pub fn clear(&self) {
        self.invalidate();
    }

    /// Number of images in the catalog (not the number cached)
    pub fn count(&self) -> usize {
        self.catalog.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.read().is_empty()
    }

    /// Filename component for a valid index, `None` otherwise
    pub fn file_name(&self, index: usize) -> Option<String> {
        self.catalog.read().file_name(index)
    }

    // ===== Lookup & load =====

    /// Get the image at `index`, decoding it on a miss
    ///
    /// Returns `None` for an index outside `[0, count)` and for decode
    /// failures. Failures are not remembered: the very next call retries the
    /// decode, so a transiently locked or half-written file heals on its
    /// own. A miss at capacity evicts the longest-resident entry first.
    pub async fn get_image(&self, index: usize) -> Option<Arc<DecodedImage>> {
        if let Some(image) = self.entries.get(&index) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(index, "cache hit");
            return Some(image.clone());
        }

        if index >= self.count() {
            return None;
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(index, "cache miss");
        self.load_image(index, Admission::Evict).await
    }

    /// Get `count` images starting at `start`, wrapping around the catalog
    ///
    /// Indices advance modulo the catalog size, so a mosaic spanning the end
    /// of the collection continues from the start; `count` larger than the
    /// catalog repeats indices. Images that fail to decode are skipped, so
    /// the result may be shorter than requested; order matches request
    /// order. An empty catalog yields an empty vec.
    pub async fn get_images(&self, start: usize, count: usize) -> Vec<Arc<DecodedImage>> {
        let len = self.count();
        if len == 0 {
            return Vec::new();
        }

        // Walk stepwise instead of summing `start + offset`, which could
        // overflow for degenerate-huge arguments.
        let mut images = Vec::with_capacity(count.min(len));
        let mut index = start % len;
        for _ in 0..count {
            if let Some(image) = self.get_image(index).await {
                images.push(image);
            }
            index = (index + 1) % len;
        }
        images
    }

    /// Cached-only lookup: no I/O, no decode, no counter updates
    pub fn peek(&self, index: usize) -> Option<Arc<DecodedImage>> {
        self.entries.get(&index).map(|image| image.value().clone())
    }

    // ===== Window preload =====

    /// Warm the cache around `current` and evict everything outside
    ///
    /// The window is `[current - keep_behind, current + pane_count +
    /// preload_ahead]`, clamped to the catalog bounds. Unlike
    /// [`get_images`](Self::get_images) it does not wrap: prefetch is a
    /// locality heuristic near the current position, while display
    /// legitimately crosses the end of the list.
    ///
    /// The eviction pass removes every entry outside the window regardless
    /// of capacity headroom, keeping memory bounded to the working set. The
    /// load pass then decodes missing window indices concurrently, but only
    /// while the cache stays within capacity; surplus loads are dropped
    /// rather than forcing more eviction. Completes once all loads settle.
    pub async fn preload_window(&self, current: usize, pane_count: usize) {
        let len = self.count();
        if len == 0 || current >= len {
            // Transient out-of-range position during a catalog swap; the
            // next navigation step issues a corrected preload.
            return;
        }

        let low = current.saturating_sub(self.keep_behind);
        let high = current
            .saturating_add(pane_count)
            .saturating_add(self.preload_ahead)
            .min(len - 1);
        let window = low..=high;
        let gen = self.generation.load(Ordering::Acquire);

        // Eviction pass
        let before = self.entries.len();
        self.entries.retain(|index, _| window.contains(index));
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            self.counters
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
        }
        {
            // Re-sync the arrival queue to the surviving entries
            let mut arrival = self.arrival.lock();
            arrival.retain(|index| self.entries.contains_key(index));
        }

        // Load pass, best effort within the remaining capacity
        let headroom = self.capacity.saturating_sub(self.entries.len());
        let missing: Vec<usize> = (low..=high)
            .filter(|index| !self.entries.contains_key(index))
            .take(headroom)
            .collect();

        let mut loads = JoinSet::new();
        for index in missing {
            let cache = self.clone();
            loads.spawn(async move {
                cache
                    .load_image_at_gen(index, gen, Admission::BestEffort)
                    .await
                    .is_some()
            });
        }

        let mut decoded = 0usize;
        while let Some(result) = loads.join_next().await {
            if matches!(result, Ok(true)) {
                decoded += 1;
            }
        }

        tracing::debug!(current, low, high, evicted, decoded, "preload window settled");
    }

    /// Fire-and-forget variant of [`preload_window`](Self::preload_window)
    ///
    /// Detaches the preload onto the runtime so navigation never waits for
    /// it. A preload superseded by newer navigation races harmlessly with
    /// the newer one; its leftovers are swept by the next eviction pass.
    /// Must be called within a tokio runtime.
    pub fn spawn_preload(&self, current: usize, pane_count: usize) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.preload_window(current, pane_count).await;
        });
    }

    // ===== Introspection =====

    /// Number of resident decoded images
    pub fn cached_count(&self) -> usize {
        self.entries.len()
    }

    /// Maximum number of resident decoded images
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of the telemetry counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
        }
    }

    // ===== Internals =====

    async fn load_image(&self, index: usize, mode: Admission) -> LoadResult {
        // Capture the generation before resolving the path: if the catalog
        // is swapped between the two, admission sees a mismatch and skips
        // the insert instead of caching a stale binding.
        let gen = self.generation.load(Ordering::Acquire);
        self.load_image_at_gen(index, gen, mode).await
    }

    /// Decode `index` (or join an in-flight decode) and admit per `mode`
    ///
    /// The caller always receives the decode result; whether it was cached
    /// is a separate question (capacity, generation).
    async fn load_image_at_gen(&self, index: usize, gen: u64, mode: Admission) -> LoadResult {
        let path = {
            let catalog = self.catalog.read();
            catalog.path(index)?.to_path_buf()
        };

        // Coalesce concurrent misses: exactly one decode per (generation,
        // index); latecomers subscribe to the winner's broadcast.
        let mut rx = match self.pending.entry((gen, index)) {
            Entry::Occupied(slot) => {
                let rx = slot.get().subscribe();
                drop(slot);
                rx
            }
            Entry::Vacant(slot) => {
                // The previous winner may have finished between our entries
                // check and here; its insert precedes its unregister.
                if let Some(image) = self.entries.get(&index) {
                    return Some(image.value().clone());
                }
                let (tx, rx) = broadcast::channel(1);
                slot.insert(tx.clone());

                // Decode on a task of its own so the slot is unregistered
                // and waiters are woken even when this caller is cancelled
                // mid-await; an abandoned slot would park every later
                // request for the index until the next catalog swap.
                let cache = self.clone();
                tokio::spawn(async move {
                    cache.run_decode(index, gen, mode, path, tx).await;
                });
                rx
            }
        };

        let image = rx.recv().await.ok().flatten()?;

        // Admit under this caller's policy: a display fetch that joined a
        // best-effort preload decode must still land in the cache, evicting
        // if it has to.
        self.admit(index, image.clone(), gen, mode);
        Some(image)
    }

    /// Winner side of a coalesced decode
    ///
    /// Detached from the requesting caller. Always unregisters the pending
    /// slot and broadcasts the outcome; the order is insert, unregister,
    /// send.
    async fn run_decode(
        &self,
        index: usize,
        gen: u64,
        mode: Admission,
        path: PathBuf,
        tx: broadcast::Sender<LoadResult>,
    ) {
        let decoder = self.decoder.clone();
        let decode_path = path.clone();
        let result = tokio::task::spawn_blocking(move || decoder.decode(&decode_path)).await;

        let image = match result {
            Ok(Ok(decoded)) => Some(Arc::new(decoded)),
            Ok(Err(err)) => {
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(index, path = %path.display(), error = %err, "image decode failed");
                None
            }
            Err(err) => {
                self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(index, path = %path.display(), error = %err, "decode task aborted");
                None
            }
        };

        if let Some(ref image) = image {
            self.admit(index, image.clone(), gen, mode);
        }

        // Unregister before broadcasting: a caller arriving now either sees
        // the resident entry or starts a fresh decode (relevant after a
        // failure, which must not be remembered).
        self.pending.remove(&(gen, index));
        let _ = tx.send(image);
    }

    /// Insert a decoded image, applying the capacity policy
    ///
    /// Idempotent for an index that is already resident, so re-admitting a
    /// broadcast value never refreshes the entry's arrival position.
    fn admit(&self, index: usize, image: Arc<DecodedImage>, gen: u64, mode: Admission) {
        if self.generation.load(Ordering::Acquire) != gen {
            tracing::debug!(index, "discarding decode from a previous catalog generation");
            return;
        }

        if self.entries.contains_key(&index) {
            return;
        }

        if self.entries.len() >= self.capacity {
            match mode {
                Admission::Evict => self.evict_oldest(),
                Admission::BestEffort => {
                    tracing::trace!(index, "preload dropped, cache at capacity");
                    return;
                }
            }
        }

        tracing::trace!(index, bytes = image.mem_size(), "cached image");
        self.entries.insert(index, image);

        let mut arrival = self.arrival.lock();
        arrival.retain(|queued| *queued != index);
        arrival.push_back(index);
    }

    /// Remove the entry that has been resident longest
    ///
    /// Not LRU: reads never refresh an entry's position in the arrival
    /// queue. Queue slots whose entry was already removed by a window pass
    /// are skipped.
    fn evict_oldest(&self) {
        let mut arrival = self.arrival.lock();
        while let Some(oldest) = arrival.pop_front() {
            if self.entries.remove(&oldest).is_some() {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(index = oldest, "evicted oldest entry");
                return;
            }
        }
    }

    /// Drop all entries and bump the generation so in-flight decodes from
    /// the old catalog never land
    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.clear();
        self.arrival.lock().clear();
        tracing::debug!("image cache cleared");
    }
}
