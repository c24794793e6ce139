//! Render-Pass Cache
//!
//! Two-level mapping from render-pass shape to attachment ops to object:
//!
//! ```text
//!  RenderPassDesc ──▶ bucket ─┬─ AttachmentOpsArray ──▶ RenderPassHelper
//!                             ├─ AttachmentOpsArray ──▶ RenderPassHelper
//!                             └─ compatible_ops (first entry created)
//! ```
//!
//! Every ops variant of one shape is compatible with every other, so
//! [`RenderPassCache::get_compatible_render_pass`] only needs the outer level.
//! [`RenderPassCache::get_render_pass_with_ops`] matches both. The two paths
//! keep independent hit/miss counters. Entries live until [`RenderPassCache::destroy`].

use rustc_hash::FxHashMap;

use super::stats::{CacheKind, CacheStats, CacheStatsAccumulator, HasCacheStats};
use crate::desc::{AttachmentOpsArray, LoadOp, RenderPassDesc, StoreOp};
use crate::device::Device;
use crate::errors::Result;

// ─── Perf Counters ───────────────────────────────────────────────────────────

/// Attachment operation counts of one render pass.
///
/// Computed once when the pass is created and added to the caller's counters
/// each time the pass is handed out with its ops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderPassPerfCounters {
    pub color_clears: u32,
    pub color_loads: u32,
    pub color_stores: u32,
    pub color_resolves: u32,
    pub color_unresolves: u32,
    pub depth_clears: u32,
    pub depth_loads: u32,
    pub depth_stores: u32,
    pub depth_resolves: u32,
    pub depth_unresolves: u32,
    pub stencil_clears: u32,
    pub stencil_loads: u32,
    pub stencil_stores: u32,
    pub stencil_unresolves: u32,
}

fn count_load(load_op: LoadOp, clears: &mut u32, loads: &mut u32) {
    match load_op {
        LoadOp::Clear => *clears += 1,
        LoadOp::Load => *loads += 1,
        LoadOp::DontCare | LoadOp::None => {}
    }
}

fn count_store(store_op: StoreOp, stores: &mut u32) {
    if store_op == StoreOp::Store {
        *stores += 1;
    }
}

impl RenderPassPerfCounters {
    #[must_use]
    pub fn from_ops(desc: &RenderPassDesc, ops: &AttachmentOpsArray) -> Self {
        let mut counters = Self::default();

        for (color_index, packed) in desc.packed_color_attachments() {
            let attachment = ops.get(packed);
            count_load(attachment.load_op(), &mut counters.color_clears, &mut counters.color_loads);
            count_store(attachment.store_op(), &mut counters.color_stores);
            counters.color_resolves += u32::from(desc.has_color_resolve_attachment(color_index));
            counters.color_unresolves += u32::from(desc.has_color_unresolve_attachment(color_index));
        }

        if let Some(packed) = desc.packed_depth_stencil_index() {
            let format = desc.format(desc.depth_stencil_attachment_index());
            let attachment = ops.get(packed);
            if format.has_depth() {
                count_load(attachment.load_op(), &mut counters.depth_clears, &mut counters.depth_loads);
                count_store(attachment.store_op(), &mut counters.depth_stores);
                counters.depth_resolves += u32::from(desc.has_depth_stencil_resolve_attachment());
            }
            if format.has_stencil() {
                count_load(
                    attachment.stencil_load_op(),
                    &mut counters.stencil_clears,
                    &mut counters.stencil_loads,
                );
                count_store(attachment.stencil_store_op(), &mut counters.stencil_stores);
            }
            counters.depth_unresolves += u32::from(desc.has_depth_unresolve_attachment());
            counters.stencil_unresolves += u32::from(desc.has_stencil_unresolve_attachment());
        }

        counters
    }

    pub fn accumulate(&mut self, other: &Self) {
        self.color_clears += other.color_clears;
        self.color_loads += other.color_loads;
        self.color_stores += other.color_stores;
        self.color_resolves += other.color_resolves;
        self.color_unresolves += other.color_unresolves;
        self.depth_clears += other.depth_clears;
        self.depth_loads += other.depth_loads;
        self.depth_stores += other.depth_stores;
        self.depth_resolves += other.depth_resolves;
        self.depth_unresolves += other.depth_unresolves;
        self.stencil_clears += other.stencil_clears;
        self.stencil_loads += other.stencil_loads;
        self.stencil_stores += other.stencil_stores;
        self.stencil_unresolves += other.stencil_unresolves;
    }
}

// ─── Render Pass Cache ───────────────────────────────────────────────────────

/// A cached render pass and the op counts it implies.
#[derive(Debug)]
pub struct RenderPassHelper<R> {
    render_pass: R,
    perf_counters: RenderPassPerfCounters,
}

impl<R> RenderPassHelper<R> {
    #[inline]
    #[must_use]
    pub fn render_pass(&self) -> &R {
        &self.render_pass
    }

    #[inline]
    #[must_use]
    pub fn perf_counters(&self) -> &RenderPassPerfCounters {
        &self.perf_counters
    }
}

struct RenderPassBucket<R> {
    /// Ops of the first pass created for this shape.
    compatible_ops: AttachmentOpsArray,
    by_ops: FxHashMap<AttachmentOpsArray, RenderPassHelper<R>>,
}

/// Deduplicates render passes by shape and attachment ops.
pub struct RenderPassCache<D: Device> {
    payload: FxHashMap<RenderPassDesc, RenderPassBucket<D::RenderPass>>,
    compatible_stats: CacheStats,
    with_ops_stats: CacheStats,
}

impl<D: Device> Default for RenderPassCache<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Device> RenderPassCache<D> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: FxHashMap::default(),
            compatible_stats: CacheStats::new(),
            with_ops_stats: CacheStats::new(),
        }
    }

    /// Any render pass with the shape of `desc`.
    ///
    /// On a miss a pass is created with load/store ops on every attachment.
    pub fn get_compatible_render_pass(&mut self, device: &mut D, desc: &RenderPassDesc) -> Result<&D::RenderPass> {
        if self.payload.contains_key(desc) {
            self.compatible_stats.hit();
            let bucket = &self.payload[desc];
            return Ok(&bucket.by_ops[&bucket.compatible_ops].render_pass);
        }

        self.compatible_stats.miss();
        let ops = AttachmentOpsArray::default_for(desc);
        let helper = self.add_render_pass(device, desc, &ops)?;
        Ok(&helper.render_pass)
    }

    /// The render pass matching both `desc` and `ops`.
    ///
    /// When `perf_counters` is given, the pass's op counts are added to it.
    pub fn get_render_pass_with_ops(
        &mut self,
        device: &mut D,
        desc: &RenderPassDesc,
        ops: &AttachmentOpsArray,
        perf_counters: Option<&mut RenderPassPerfCounters>,
    ) -> Result<&D::RenderPass> {
        let is_hit = self
            .payload
            .get(desc)
            .is_some_and(|bucket| bucket.by_ops.contains_key(ops));

        let helper = if is_hit {
            self.with_ops_stats.hit();
            log::trace!("Render pass cache hit: {} attachments", desc.attachment_count());
            &self.payload[desc].by_ops[ops]
        } else {
            self.with_ops_stats.miss();
            self.add_render_pass(device, desc, ops)?
        };

        if let Some(counters) = perf_counters {
            counters.accumulate(&helper.perf_counters);
        }
        Ok(&helper.render_pass)
    }

    fn add_render_pass(
        &mut self,
        device: &mut D,
        desc: &RenderPassDesc,
        ops: &AttachmentOpsArray,
    ) -> Result<&RenderPassHelper<D::RenderPass>> {
        let render_pass = device.create_render_pass(desc, ops)?;
        log::debug!(
            "Created render pass: {} attachments, {}x MSAA",
            desc.attachment_count(),
            desc.samples()
        );

        let bucket = self.payload.entry(*desc).or_insert_with(|| RenderPassBucket {
            compatible_ops: *ops,
            by_ops: FxHashMap::default(),
        });
        Ok(bucket.by_ops.entry(*ops).or_insert(RenderPassHelper {
            render_pass,
            perf_counters: RenderPassPerfCounters::from_ops(desc, ops),
        }))
    }

    /// Ops the compatible render pass of `desc` was created with.
    #[must_use]
    pub fn compatible_ops(&self, desc: &RenderPassDesc) -> Option<&AttachmentOpsArray> {
        self.payload.get(desc).map(|bucket| &bucket.compatible_ops)
    }

    /// Number of cached render pass objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.values().map(|bucket| bucket.by_ops.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[must_use]
    pub fn compatible_stats(&self) -> &CacheStats {
        &self.compatible_stats
    }

    #[must_use]
    pub fn with_ops_stats(&self) -> &CacheStats {
        &self.with_ops_stats
    }

    /// Hands every render pass back to `device`.
    pub fn destroy(&mut self, device: &mut D) {
        let count = self.len();
        for (_, bucket) in self.payload.drain() {
            for (_, helper) in bucket.by_ops {
                device.destroy_render_pass(helper.render_pass);
            }
        }
        log::debug!("Destroyed {count} render passes");
    }
}

impl<D: Device> HasCacheStats for RenderPassCache<D> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        accumulator.accumulate(CacheKind::CompatibleRenderPass, &self.compatible_stats);
        accumulator.accumulate(CacheKind::RenderPassWithOps, &self.with_ops_stats);
        self.compatible_stats.reset();
        self.with_ops_stats.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{FormatId, ImageLayout, PackedAttachmentIndex};

    #[test]
    fn test_perf_counters_follow_ops() {
        let mut desc = RenderPassDesc::new();
        desc.pack_color_attachment(0, FormatId::R8G8B8A8_UNORM);
        desc.pack_color_attachment(1, FormatId::R8G8B8A8_UNORM);
        desc.pack_color_resolve_attachment(1);
        desc.pack_depth_stencil_attachment(FormatId::D24_UNORM_S8_UINT);

        let mut ops = AttachmentOpsArray::default_for(&desc);
        let first = PackedAttachmentIndex::new(0);
        let depth_stencil = desc.packed_depth_stencil_index().unwrap();
        ops.set_clear_op(first);
        ops.set_invalidated(first);
        ops.set_clear_stencil_op(depth_stencil);

        let counters = RenderPassPerfCounters::from_ops(&desc, &ops);
        assert_eq!(counters.color_clears, 1);
        assert_eq!(counters.color_loads, 1);
        assert_eq!(counters.color_stores, 1);
        assert_eq!(counters.color_resolves, 1);
        assert_eq!(counters.depth_loads, 1);
        assert_eq!(counters.depth_stores, 1);
        assert_eq!(counters.stencil_clears, 1);
        assert_eq!(counters.stencil_stores, 1);

        let mut total = RenderPassPerfCounters::default();
        total.accumulate(&counters);
        total.accumulate(&counters);
        assert_eq!(total.color_clears, 2);
    }

    #[test]
    fn test_depth_only_format_skips_stencil_counts() {
        let mut desc = RenderPassDesc::new();
        desc.pack_depth_stencil_attachment(FormatId::D32_FLOAT);
        let mut ops = AttachmentOpsArray::default_for(&desc);
        let packed = desc.packed_depth_stencil_index().unwrap();
        ops.set_layouts(packed, ImageLayout::Undefined, ImageLayout::DepthStencilAttachment);

        let counters = RenderPassPerfCounters::from_ops(&desc, &ops);
        assert_eq!(counters.depth_loads, 1);
        assert_eq!(counters.stencil_loads, 0);
        assert_eq!(counters.stencil_stores, 0);
    }
}
