//! Descriptor-set-layout and pipeline-layout caches.
//!
//! A pipeline layout references one descriptor-set layout per set. Those are
//! acquired from the [`DescriptorSetLayoutCache`] when the pipeline layout is
//! created and released back when it is destroyed, so the sharing graph stays
//! acyclic: pipeline layouts point at set layouts, never the reverse.

use smallvec::SmallVec;

use super::shared::{RefCountedCache, SharedHandle};
use super::stats::{CacheKind, CacheStats, CacheStatsAccumulator, HasCacheStats};
use crate::desc::{DescriptorSetLayoutDesc, MAX_DESCRIPTOR_SET_LAYOUTS, PipelineLayoutDesc};
use crate::device::Device;
use crate::errors::Result;

// ─── Descriptor Set Layouts ──────────────────────────────────────────────────

pub type DescriptorSetLayoutHandle<D> = SharedHandle<<D as Device>::DescriptorSetLayout>;

pub struct DescriptorSetLayoutCache<D: Device> {
    cache: RefCountedCache<DescriptorSetLayoutDesc, D::DescriptorSetLayout>,
}

impl<D: Device> Default for DescriptorSetLayoutCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> DescriptorSetLayoutCache<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RefCountedCache::new(CacheKind::DescriptorSetLayout),
        }
    }

    pub fn get_descriptor_set_layout(
        &mut self,
        device: &mut D,
        desc: &DescriptorSetLayoutDesc,
    ) -> Result<DescriptorSetLayoutHandle<D>> {
        self.cache
            .get_or_create(desc, || device.create_descriptor_set_layout(desc))
    }

    pub fn acquire(&mut self, handle: &DescriptorSetLayoutHandle<D>) -> DescriptorSetLayoutHandle<D> {
        self.cache.acquire(handle)
    }

    /// Destroys the layout once `handle` was its last reference.
    pub fn release(&mut self, device: &mut D, handle: DescriptorSetLayoutHandle<D>) {
        if let Some((_, layout)) = self.cache.release(handle) {
            device.destroy_descriptor_set_layout(layout);
        }
    }

    #[must_use]
    pub fn get(&self, handle: &DescriptorSetLayoutHandle<D>) -> &D::DescriptorSetLayout {
        self.cache.get(handle)
    }

    #[must_use]
    pub fn ref_count(&self, handle: &DescriptorSetLayoutHandle<D>) -> u32 {
        self.cache.ref_count(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    pub fn destroy(&mut self, device: &mut D) {
        self.cache
            .destroy(|layout| device.destroy_descriptor_set_layout(layout));
    }
}

impl<D: Device> HasCacheStats for DescriptorSetLayoutCache<D> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        self.cache.accumulate_cache_stats(accumulator);
    }
}

// ─── Pipeline Layouts ────────────────────────────────────────────────────────

/// A pipeline layout and the set layouts it holds references to.
pub struct PipelineLayoutHelper<D: Device> {
    layout: D::PipelineLayout,
    set_layouts: SmallVec<[DescriptorSetLayoutHandle<D>; MAX_DESCRIPTOR_SET_LAYOUTS]>,
}

impl<D: Device> PipelineLayoutHelper<D> {
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &D::PipelineLayout {
        &self.layout
    }

    #[must_use]
    pub fn set_layouts(&self) -> &[DescriptorSetLayoutHandle<D>] {
        &self.set_layouts
    }
}

pub type PipelineLayoutHandle<D> = SharedHandle<PipelineLayoutHelper<D>>;

/// Number of sets a layout needs: up to and including the last non-empty one.
fn used_set_count(desc: &PipelineLayoutDesc) -> usize {
    desc.descriptor_set_layouts()
        .iter()
        .rposition(|set| !set.is_empty())
        .map_or(0, |last| last + 1)
}

fn release_set_layouts<D: Device>(
    device: &mut D,
    set_layout_cache: &mut DescriptorSetLayoutCache<D>,
    set_layouts: impl IntoIterator<Item = DescriptorSetLayoutHandle<D>>,
) {
    for handle in set_layouts {
        set_layout_cache.release(device, handle);
    }
}

pub struct PipelineLayoutCache<D: Device> {
    cache: RefCountedCache<PipelineLayoutDesc, PipelineLayoutHelper<D>>,
}

impl<D: Device> Default for PipelineLayoutCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> PipelineLayoutCache<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RefCountedCache::new(CacheKind::PipelineLayout),
        }
    }

    /// Looks `desc` up, creating the layout and its set layouts on a miss.
    ///
    /// If creation fails, every set layout acquired for it is released again.
    pub fn get_pipeline_layout(
        &mut self,
        device: &mut D,
        set_layout_cache: &mut DescriptorSetLayoutCache<D>,
        desc: &PipelineLayoutDesc,
    ) -> Result<PipelineLayoutHandle<D>> {
        self.cache.get_or_create(desc, || {
            let mut set_layouts: SmallVec<[DescriptorSetLayoutHandle<D>; MAX_DESCRIPTOR_SET_LAYOUTS]> = SmallVec::new();
            for set_desc in &desc.descriptor_set_layouts()[..used_set_count(desc)] {
                match set_layout_cache.get_descriptor_set_layout(device, set_desc) {
                    Ok(handle) => set_layouts.push(handle),
                    Err(error) => {
                        release_set_layouts(device, set_layout_cache, set_layouts);
                        return Err(error);
                    }
                }
            }

            let created = {
                let resolved: SmallVec<[&D::DescriptorSetLayout; MAX_DESCRIPTOR_SET_LAYOUTS]> = set_layouts
                    .iter()
                    .map(|handle| set_layout_cache.get(handle))
                    .collect();
                device.create_pipeline_layout(desc, &resolved)
            };
            match created {
                Ok(layout) => Ok(PipelineLayoutHelper { layout, set_layouts }),
                Err(error) => {
                    release_set_layouts(device, set_layout_cache, set_layouts);
                    Err(error)
                }
            }
        })
    }

    pub fn acquire(&mut self, handle: &PipelineLayoutHandle<D>) -> PipelineLayoutHandle<D> {
        self.cache.acquire(handle)
    }

    /// Destroys the layout once `handle` was its last reference, releasing
    /// its set layouts.
    pub fn release(
        &mut self,
        device: &mut D,
        set_layout_cache: &mut DescriptorSetLayoutCache<D>,
        handle: PipelineLayoutHandle<D>,
    ) {
        if let Some((_, helper)) = self.cache.release(handle) {
            device.destroy_pipeline_layout(helper.layout);
            release_set_layouts(device, set_layout_cache, helper.set_layouts);
        }
    }

    #[must_use]
    pub fn get(&self, handle: &PipelineLayoutHandle<D>) -> &D::PipelineLayout {
        &self.cache.get(handle).layout
    }

    #[must_use]
    pub fn helper(&self, handle: &PipelineLayoutHandle<D>) -> &PipelineLayoutHelper<D> {
        self.cache.get(handle)
    }

    #[must_use]
    pub fn ref_count(&self, handle: &PipelineLayoutHandle<D>) -> u32 {
        self.cache.ref_count(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Destroys every pipeline layout. Call before destroying `set_layout_cache`.
    pub fn destroy(&mut self, device: &mut D, set_layout_cache: &mut DescriptorSetLayoutCache<D>) {
        let mut helpers = Vec::with_capacity(self.cache.len());
        self.cache.destroy(|helper| helpers.push(helper));
        for helper in helpers {
            device.destroy_pipeline_layout(helper.layout);
            release_set_layouts(device, set_layout_cache, helper.set_layouts);
        }
    }
}

impl<D: Device> HasCacheStats for PipelineLayoutCache<D> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        self.cache.accumulate_cache_stats(accumulator);
    }
}
