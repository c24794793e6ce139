//! Sampler and format-conversion sampler caches.
//!
//! Every cached sampler carries a [`SamplerSerial`]. Set layouts with
//! immutable samplers and texture binding keys refer to samplers by that
//! serial, so a sampler and the keys built from it agree on identity.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::shared::{RefCountedCache, SharedHandle};
use super::stats::{CacheKind, CacheStats, CacheStatsAccumulator, HasCacheStats};
use crate::desc::{SamplerDesc, YcbcrConversionDesc};
use crate::device::Device;
use crate::errors::Result;
use crate::serial::{ResourceSerialFactory, SamplerSerial};

// ─── Samplers ────────────────────────────────────────────────────────────────

/// A cached sampler and the serial binding keys use for it.
pub struct SamplerHelper<D: Device> {
    sampler: D::Sampler,
    serial: SamplerSerial,
}

impl<D: Device> SamplerHelper<D> {
    #[inline]
    #[must_use]
    pub fn sampler(&self) -> &D::Sampler {
        &self.sampler
    }

    #[inline]
    #[must_use]
    pub fn sampler_serial(&self) -> SamplerSerial {
        self.serial
    }
}

pub type SamplerHandle<D> = SharedHandle<SamplerHelper<D>>;

pub struct SamplerCache<D: Device> {
    cache: RefCountedCache<SamplerDesc, SamplerHelper<D>>,
}

impl<D: Device> Default for SamplerCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> SamplerCache<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RefCountedCache::new(CacheKind::Sampler),
        }
    }

    pub fn get_sampler(&mut self, device: &mut D, desc: &SamplerDesc) -> Result<SamplerHandle<D>> {
        self.cache.get_or_create(desc, || {
            let sampler = device.create_sampler(desc)?;
            Ok(SamplerHelper {
                sampler,
                serial: ResourceSerialFactory.generate_sampler_serial(),
            })
        })
    }

    pub fn acquire(&mut self, handle: &SamplerHandle<D>) -> SamplerHandle<D> {
        self.cache.acquire(handle)
    }

    /// Destroys the sampler once `handle` was its last reference.
    pub fn release(&mut self, device: &mut D, handle: SamplerHandle<D>) {
        if let Some((_, helper)) = self.cache.release(handle) {
            device.destroy_sampler(helper.sampler);
        }
    }

    #[must_use]
    pub fn get(&self, handle: &SamplerHandle<D>) -> &D::Sampler {
        &self.cache.get(handle).sampler
    }

    /// The serial to put in set layouts and texture binding keys.
    #[must_use]
    pub fn sampler_serial(&self, handle: &SamplerHandle<D>) -> SamplerSerial {
        self.cache.get(handle).serial
    }

    #[must_use]
    pub fn helper(&self, handle: &SamplerHandle<D>) -> &SamplerHelper<D> {
        self.cache.get(handle)
    }

    #[must_use]
    pub fn ref_count(&self, handle: &SamplerHandle<D>) -> u32 {
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
        self.cache.destroy(|helper| device.destroy_sampler(helper.sampler));
    }
}

impl<D: Device> HasCacheStats for SamplerCache<D> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        self.cache.accumulate_cache_stats(accumulator);
    }
}

// ─── Ycbcr Conversions ───────────────────────────────────────────────────────

pub type YcbcrConversionHandle<D> = SharedHandle<<D as Device>::YcbcrConversion>;

/// Format-conversion objects, also reachable by external format id.
///
/// Several live conversions may share an external format (differing in model
/// or range). The index lists all of them in creation order.
pub struct SamplerYcbcrConversionCache<D: Device> {
    cache: RefCountedCache<YcbcrConversionDesc, D::YcbcrConversion>,
    by_external_format: FxHashMap<u64, SmallVec<[YcbcrConversionDesc; 2]>>,
}

impl<D: Device> Default for SamplerYcbcrConversionCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> SamplerYcbcrConversionCache<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: RefCountedCache::new(CacheKind::SamplerYcbcrConversion),
            by_external_format: FxHashMap::default(),
        }
    }

    pub fn get_yuv_conversion(
        &mut self,
        device: &mut D,
        desc: &YcbcrConversionDesc,
    ) -> Result<YcbcrConversionHandle<D>> {
        let handle = self
            .cache
            .get_or_create(desc, || device.create_ycbcr_conversion(desc))?;

        let external_format = desc.external_format();
        if external_format != 0 {
            let descs = self.by_external_format.entry(external_format).or_default();
            if !descs.contains(desc) {
                descs.push(*desc);
            }
        }
        Ok(handle)
    }

    /// The oldest live conversion created for `external_format`, if any.
    #[must_use]
    pub fn get_yuv_conversion_from_external_format(&self, external_format: u64) -> Option<&D::YcbcrConversion> {
        let desc = self.by_external_format.get(&external_format)?.first()?;
        self.cache.lookup(desc)
    }

    pub fn acquire(&mut self, handle: &YcbcrConversionHandle<D>) -> YcbcrConversionHandle<D> {
        self.cache.acquire(handle)
    }

    /// Destroys the conversion once `handle` was its last reference.
    pub fn release(&mut self, device: &mut D, handle: YcbcrConversionHandle<D>) {
        if let Some((desc, conversion)) = self.cache.release(handle) {
            let external_format = desc.external_format();
            if let Some(descs) = self.by_external_format.get_mut(&external_format) {
                descs.retain(|indexed| *indexed != desc);
                if descs.is_empty() {
                    self.by_external_format.remove(&external_format);
                }
            }
            device.destroy_ycbcr_conversion(conversion);
        }
    }

    #[must_use]
    pub fn get(&self, handle: &YcbcrConversionHandle<D>) -> &D::YcbcrConversion {
        self.cache.get(handle)
    }

    #[must_use]
    pub fn ref_count(&self, handle: &YcbcrConversionHandle<D>) -> u32 {
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
        self.by_external_format.clear();
        self.cache
            .destroy(|conversion| device.destroy_ycbcr_conversion(conversion));
    }
}

impl<D: Device> HasCacheStats for SamplerYcbcrConversionCache<D> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        self.cache.accumulate_cache_stats(accumulator);
    }
}
