// SPDX-License-Identifier: MPL-2.0
//! Image load bookkeeping: tags, completions and the frame cache.
//!
//! Loads finish in any order. Each request carries a [`LoadTag`] describing
//! the state it was issued for; the viewer core compares the tag with its
//! current state on completion and drops results that no longer apply.

use crate::application::port::render::{BackendError, LoadFuture};
use crate::domain::sequence::ImageId;
use lru::LruCache;
use std::num::NonZeroUsize;

/// What a load was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadTag {
    /// Manual navigation, series opening or surface binding, for `index` of
    /// the sequence with the given generation.
    Navigation { sequence: u64, index: usize },
    /// A cine tick of the session with the given generation.
    Cine { index: usize, generation: u64 },
}

impl LoadTag {
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            LoadTag::Navigation { index, .. } | LoadTag::Cine { index, .. } => index,
        }
    }

    #[must_use]
    pub fn is_cine(self) -> bool {
        matches!(self, LoadTag::Cine { .. })
    }
}

/// A load waiting to be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub tag: LoadTag,
    pub image: ImageId,
}

/// A started load, ready to be spawned.
pub struct LoadJob<I> {
    pub tag: LoadTag,
    pub image: ImageId,
    pub future: LoadFuture<I>,
}

/// A finished load, sent back to the core.
#[derive(Debug, Clone)]
pub struct LoadCompletion<I> {
    pub tag: LoadTag,
    pub image: ImageId,
    pub result: Result<I, BackendError>,
}

/// Frame cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage (0.0 - 100.0).
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// LRU cache of loaded images keyed by [`ImageId`].
///
/// A capacity of zero disables caching entirely.
pub struct FrameCache<I> {
    cache: Option<LruCache<ImageId, I>>,
    stats: CacheStats,
}

impl<I: Clone> FrameCache<I> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
            stats: CacheStats::default(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Looks an image up, updating LRU order.
    pub fn get(&mut self, id: &ImageId) -> Option<I> {
        let cache = self.cache.as_mut()?;
        if let Some(image) = cache.get(id) {
            self.stats.hits += 1;
            Some(image.clone())
        } else {
            self.stats.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, id: ImageId, image: I) {
        if let Some(cache) = self.cache.as_mut() {
            cache.put(id, image);
            self.stats.insertions += 1;
        }
    }

    #[must_use]
    pub fn contains(&self, id: &ImageId) -> bool {
        self.cache.as_ref().is_some_and(|cache| cache.contains(id))
    }

    pub fn clear(&mut self) {
        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, LruCache::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
