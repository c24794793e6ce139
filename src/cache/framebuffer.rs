//! Framebuffer cache.
//!
//! Framebuffers are keyed by the views (and subresources) they attach. The
//! render pass and extent they are created against are implied by those
//! views, so they are not part of the key.

use glam::UVec2;
use rustc_hash::FxHashMap;

use super::stats::{CacheKind, CacheStats, CacheStatsAccumulator, HasCacheStats};
use crate::desc::FramebufferDesc;
use crate::device::Device;
use crate::errors::Result;

pub struct FramebufferCache<D: Device> {
    payload: FxHashMap<FramebufferDesc, D::Framebuffer>,
    stats: CacheStats,
}

impl<D: Device> Default for FramebufferCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> FramebufferCache<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: FxHashMap::default(),
            stats: CacheStats::new(),
        }
    }

    pub fn get_framebuffer(
        &mut self,
        device: &mut D,
        desc: &FramebufferDesc,
        render_pass: &D::RenderPass,
        extent: UVec2,
    ) -> Result<&D::Framebuffer> {
        if self.payload.contains_key(desc) {
            self.stats.hit();
            return Ok(&self.payload[desc]);
        }

        self.stats.miss();
        let framebuffer = device.create_framebuffer(desc, render_pass, extent)?;
        log::debug!(
            "Created framebuffer: {} attachments, {}x{}x{}",
            desc.attachment_count(),
            extent.x,
            extent.y,
            desc.layer_count()
        );
        Ok(self.payload.entry(*desc).or_insert(framebuffer))
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

    pub fn destroy(&mut self, device: &mut D) {
        for (_, framebuffer) in self.payload.drain() {
            device.destroy_framebuffer(framebuffer);
        }
    }
}

impl<D: Device> HasCacheStats for FramebufferCache<D> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        accumulator.accumulate(CacheKind::Framebuffer, &self.stats);
        self.stats.reset();
    }
}
