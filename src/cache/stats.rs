//! Cache Statistics
//!
//! Every cache owns a [`CacheStats`] hit/miss pair. Higher scopes aggregate
//! them through [`HasCacheStats::accumulate_cache_stats`], which folds a
//! cache's counters into a [`CacheStatsAccumulator`] and resets the local
//! pair, so each lookup is reported exactly once.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Hit/miss counter pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    hit_count: u64,
    miss_count: u64,
}

impl CacheStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn hit(&mut self) {
        self.hit_count += 1;
    }

    #[inline]
    pub fn miss(&mut self) {
        self.miss_count += 1;
    }

    /// Adds `other`'s counters to `self`.
    pub fn accumulate(&mut self, other: &CacheStats) {
        self.hit_count += other.hit_count;
        self.miss_count += other.miss_count;
    }

    #[must_use]
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    #[must_use]
    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }

    #[must_use]
    pub fn lookup_count(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    /// Fraction of lookups that hit; `0.0` before any lookup.
    #[must_use]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.lookup_count();
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Every kind of cache that reports statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    CompatibleRenderPass,
    RenderPassWithOps,
    GraphicsPipeline,
    DescriptorSetLayout,
    PipelineLayout,
    Sampler,
    SamplerYcbcrConversion,
    Framebuffer,
    TextureDescriptors,
    UniformsAndXfbDescriptors,
    ShaderBuffersDescriptors,
    DriverUniformsDescriptors,
}

impl CacheKind {
    pub const COUNT: usize = 12;

    pub const ALL: [Self; Self::COUNT] = [
        Self::CompatibleRenderPass,
        Self::RenderPassWithOps,
        Self::GraphicsPipeline,
        Self::DescriptorSetLayout,
        Self::PipelineLayout,
        Self::Sampler,
        Self::SamplerYcbcrConversion,
        Self::Framebuffer,
        Self::TextureDescriptors,
        Self::UniformsAndXfbDescriptors,
        Self::ShaderBuffersDescriptors,
        Self::DriverUniformsDescriptors,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Destination of folded cache statistics.
pub trait CacheStatsAccumulator {
    fn accumulate(&mut self, kind: CacheKind, stats: &CacheStats);
}

/// Implemented by every cache.
pub trait HasCacheStats {
    /// Folds this cache's counters into `accumulator` and resets them.
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator);
}

/// Aggregated statistics, one [`CacheStats`] per [`CacheKind`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerCacheStats {
    stats: [CacheStats; CacheKind::COUNT],
}

impl PerCacheStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, kind: CacheKind) -> &CacheStats {
        &self.stats[kind.index()]
    }

    /// Sum over every kind.
    #[must_use]
    pub fn total(&self) -> CacheStats {
        let mut total = CacheStats::new();
        for stats in &self.stats {
            total.accumulate(stats);
        }
        total
    }

    pub fn reset(&mut self) {
        self.stats = Default::default();
    }

    /// `(kind, stats)` pairs for every kind with at least one lookup.
    pub fn iter(&self) -> impl Iterator<Item = (CacheKind, &CacheStats)> + '_ {
        CacheKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .filter(|(_, stats)| stats.lookup_count() > 0)
    }
}

impl CacheStatsAccumulator for PerCacheStats {
    fn accumulate(&mut self, kind: CacheKind, stats: &CacheStats) {
        self.stats[kind.index()].accumulate(stats);
    }
}

impl Serialize for PerCacheStats {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (kind, stats) in self.iter() {
            map.serialize_entry(&kind, stats)?;
        }
        map.end()
    }
}
