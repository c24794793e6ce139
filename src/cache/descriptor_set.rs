//! Per-draw binding-set caches.
//!
//! These map a binding key (which textures, buffers or uniforms a draw uses)
//! to an already-written descriptor set. The sets usually belong to a pool
//! owned by the caller, who resets the pool and then calls
//! [`DescriptorSetCache::clear`]; individually owned sets go back through
//! [`DescriptorSetCache::destroy`]. Dropping a cache that still holds entries
//! is a bug in that ordering.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use super::stats::{CacheKind, CacheStats, CacheStatsAccumulator, HasCacheStats};
use crate::desc::{ShaderBuffersDescriptorDesc, TextureDescriptorDesc, UniformsAndXfbDescriptorDesc};

/// A key type for a [`DescriptorSetCache`], tagged with the stats kind it
/// reports under.
pub trait DescriptorSetKey: Eq + Hash + Clone {
    const CACHE_KIND: CacheKind;
}

impl DescriptorSetKey for TextureDescriptorDesc {
    const CACHE_KIND: CacheKind = CacheKind::TextureDescriptors;
}

impl DescriptorSetKey for UniformsAndXfbDescriptorDesc {
    const CACHE_KIND: CacheKind = CacheKind::UniformsAndXfbDescriptors;
}

impl DescriptorSetKey for ShaderBuffersDescriptorDesc {
    const CACHE_KIND: CacheKind = CacheKind::ShaderBuffersDescriptors;
}

/// Driver uniforms are keyed by the serial of the buffer backing them.
impl DescriptorSetKey for u32 {
    const CACHE_KIND: CacheKind = CacheKind::DriverUniformsDescriptors;
}

pub struct DescriptorSetCache<K: DescriptorSetKey, S> {
    payload: FxHashMap<K, S>,
    stats: CacheStats,
}

pub type TextureDescriptorSetCache<S> = DescriptorSetCache<TextureDescriptorDesc, S>;
pub type UniformsAndXfbDescriptorSetCache<S> = DescriptorSetCache<UniformsAndXfbDescriptorDesc, S>;
pub type ShaderBuffersDescriptorSetCache<S> = DescriptorSetCache<ShaderBuffersDescriptorDesc, S>;
pub type DriverUniformsDescriptorSetCache<S> = DescriptorSetCache<u32, S>;

impl<K: DescriptorSetKey, S> Default for DescriptorSetCache<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: DescriptorSetKey, S> DescriptorSetCache<K, S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: FxHashMap::default(),
            stats: CacheStats::new(),
        }
    }

    /// The set cached for `key`. Records a hit or a miss.
    pub fn get(&mut self, key: &K) -> Option<&S> {
        match self.payload.get(key) {
            Some(set) => {
                self.stats.hit();
                Some(set)
            }
            None => {
                self.stats.miss();
                None
            }
        }
    }

    /// Caches `set` for `key`, returning the set it replaced.
    pub fn insert(&mut self, key: K, set: S) -> Option<S> {
        self.payload.insert(key, set)
    }

    /// Forgets every entry. Call after the sets' pool has been reset.
    pub fn clear(&mut self) {
        if !self.payload.is_empty() {
            log::debug!("Clearing {} {:?} entries", self.payload.len(), K::CACHE_KIND);
        }
        self.payload.clear();
    }

    /// Hands every cached set to `destroy` and empties the cache.
    pub fn destroy(&mut self, mut destroy: impl FnMut(S)) {
        for (_, set) in self.payload.drain() {
            destroy(set);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

impl<K: DescriptorSetKey, S> HasCacheStats for DescriptorSetCache<K, S> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        accumulator.accumulate(K::CACHE_KIND, &self.stats);
        self.stats.reset();
    }
}

impl<K: DescriptorSetKey, S> Drop for DescriptorSetCache<K, S> {
    fn drop(&mut self) {
        debug_assert!(
            self.payload.is_empty() || std::thread::panicking(),
            "{:?} cache dropped with {} entries; clear it first",
            K::CACHE_KIND,
            self.payload.len()
        );
    }
}
