//! Render-pass shape and attachment operations.
//!
//! # Attachment Indexing
//!
//! The GL-facing *color index* is sparse: draw buffer 0 and 3 may be enabled
//! with 1 and 2 disabled. [`RenderPassDesc`] keeps those gaps so it can be
//! compared cheaply against framebuffer state. The backend render pass is
//! dense, and [`PackedAttachmentIndex`] addresses that dense space: enabled
//! colors first, in color-index order, then depth/stencil.
//!
//! ```text
//!  color index:     0    1    2    3   (ds)
//!  format:         RGBA  --   --  RGBA  D24S8
//!  packed index:    0              1     2
//! ```

use bytemuck::{Pod, Zeroable};

use super::state::{FormatId, ImageLayout, LoadOp, PackedEnum, SrgbWriteControlMode, StoreOp};
use super::{MAX_DRAW_BUFFERS, MAX_FRAMEBUFFER_ATTACHMENTS};
use crate::packing::{BitField, narrow};

// ─── RenderPassDesc ──────────────────────────────────────────────────────────

// Byte 0.
const LOG_SAMPLES: BitField = BitField::new(0, 3);
const COLOR_ATTACHMENT_RANGE: BitField = BitField::new(3, 4);
const FRAMEBUFFER_FETCH: BitField = BitField::new(7, 1);

// Flag bits sharing the last attachment-format byte with the depth/stencil format.
const FLAGS_INDEX: usize = MAX_DRAW_BUFFERS;
const RENDER_TO_TEXTURE: BitField = BitField::new(7, 1);
const RESOLVE_DEPTH_STENCIL: BitField = BitField::new(6, 1);
const UNRESOLVE_DEPTH: BitField = BitField::new(5, 1);
const UNRESOLVE_STENCIL: BitField = BitField::new(4, 1);
const SRGB_WRITE_CONTROL: BitField = BitField::new(3, 1);
const DEPTH_STENCIL_FORMAT: BitField = BitField::new(0, 3);

/// Shape of a render pass: formats, sample count, resolve/unresolve layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct RenderPassDesc {
    samples_and_range: u8,
    color_resolve_mask: u8,
    color_unresolve_mask: u8,
    /// Indexed by color index; the depth/stencil format follows the color
    /// range. The last byte also carries the flag bits.
    attachment_formats: [u8; MAX_DRAW_BUFFERS + 1],
}

impl_packed_desc!(RenderPassDesc, 12);

impl RenderPassDesc {
    #[must_use]
    pub fn new() -> Self {
        let mut desc = Self::default();
        desc.set_samples(1);
        desc
    }

    // ── Attachments ──────────────────────────────────────────────────────────

    /// Enables color attachment `color_index` with `format`.
    ///
    /// Color attachments must be packed before the depth/stencil attachment.
    pub fn pack_color_attachment(&mut self, color_index: usize, format: FormatId) {
        assert!(color_index < MAX_DRAW_BUFFERS, "color index {color_index} out of range");
        assert!(!format.is_none() && !format.is_depth_or_stencil(), "{format:?} is not a color format");
        assert!(
            !self.has_depth_stencil_attachment(),
            "color attachments must be packed before depth/stencil"
        );
        self.attachment_formats[color_index] = format.0;
        self.extend_color_range(color_index);
    }

    /// Marks `color_index` as a disabled draw buffer inside the color range.
    pub fn pack_color_attachment_gap(&mut self, color_index: usize) {
        assert!(color_index < MAX_DRAW_BUFFERS, "color index {color_index} out of range");
        assert!(
            !self.has_depth_stencil_attachment(),
            "color attachments must be packed before depth/stencil"
        );
        self.attachment_formats[color_index] = FormatId::NONE.0;
        self.extend_color_range(color_index);
    }

    fn extend_color_range(&mut self, color_index: usize) {
        let range = self.color_attachment_range().max(color_index + 1);
        COLOR_ATTACHMENT_RANGE.set(&mut self.samples_and_range, narrow(range));
    }

    pub fn pack_depth_stencil_attachment(&mut self, format: FormatId) {
        assert!(format.is_depth_or_stencil(), "{format:?} is not a depth/stencil format");
        let index = self.depth_stencil_attachment_index();
        self.set_format(index, format);
    }

    pub fn pack_color_resolve_attachment(&mut self, color_index: usize) {
        assert!(
            self.is_color_attachment_enabled(color_index),
            "resolving disabled color attachment {color_index}"
        );
        self.color_resolve_mask |= 1 << color_index;
    }

    pub fn remove_color_resolve_attachment(&mut self, color_index: usize) {
        assert!(color_index < MAX_DRAW_BUFFERS, "color index {color_index} out of range");
        self.color_resolve_mask &= !(1 << color_index);
    }

    pub fn pack_color_unresolve_attachment(&mut self, color_index: usize) {
        assert!(
            self.is_color_attachment_enabled(color_index),
            "unresolving disabled color attachment {color_index}"
        );
        self.color_unresolve_mask |= 1 << color_index;
    }

    pub fn remove_color_unresolve_attachment(&mut self, color_index: usize) {
        assert!(color_index < MAX_DRAW_BUFFERS, "color index {color_index} out of range");
        self.color_unresolve_mask &= !(1 << color_index);
    }

    pub fn pack_depth_stencil_resolve_attachment(&mut self) {
        assert!(self.has_depth_stencil_attachment(), "no depth/stencil attachment to resolve");
        RESOLVE_DEPTH_STENCIL.set_bool(self.flags_mut(), true);
    }

    pub fn pack_depth_stencil_unresolve_attachment(&mut self, unresolve_depth: bool, unresolve_stencil: bool) {
        assert!(self.has_depth_stencil_attachment(), "no depth/stencil attachment to unresolve");
        UNRESOLVE_DEPTH.set_bool(self.flags_mut(), unresolve_depth);
        UNRESOLVE_STENCIL.set_bool(self.flags_mut(), unresolve_stencil);
    }

    pub fn remove_depth_stencil_unresolve_attachment(&mut self) {
        UNRESOLVE_DEPTH.set_bool(self.flags_mut(), false);
        UNRESOLVE_STENCIL.set_bool(self.flags_mut(), false);
    }

    // ── Modes ────────────────────────────────────────────────────────────────

    /// # Panics
    ///
    /// Panics if `samples` is not a power of two or its log2 does not fit
    /// the 3-bit field (more than 128 samples).
    pub fn set_samples(&mut self, samples: u32) {
        assert!(samples.is_power_of_two(), "sample count {samples} is not a power of two");
        LOG_SAMPLES.set(&mut self.samples_and_range, samples.trailing_zeros());
    }

    pub fn set_framebuffer_fetch_mode(&mut self, has_framebuffer_fetch: bool) {
        FRAMEBUFFER_FETCH.set_bool(&mut self.samples_and_range, has_framebuffer_fetch);
    }

    pub fn set_write_control_mode(&mut self, mode: SrgbWriteControlMode) {
        SRGB_WRITE_CONTROL.set(self.flags_mut(), mode.to_bits());
    }

    pub fn update_render_to_texture(&mut self, is_render_to_texture: bool) {
        RENDER_TO_TEXTURE.set_bool(self.flags_mut(), is_render_to_texture);
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn samples(&self) -> u32 {
        1 << LOG_SAMPLES.get(self.samples_and_range)
    }

    #[inline]
    #[must_use]
    pub fn color_attachment_range(&self) -> usize {
        COLOR_ATTACHMENT_RANGE.get(self.samples_and_range) as usize
    }

    /// Color index slot holding the depth/stencil format.
    #[inline]
    #[must_use]
    pub fn depth_stencil_attachment_index(&self) -> usize {
        self.color_attachment_range()
    }

    #[must_use]
    pub fn format(&self, index: usize) -> FormatId {
        if index == FLAGS_INDEX {
            FormatId(narrow(DEPTH_STENCIL_FORMAT.get(self.attachment_formats[index])))
        } else {
            FormatId(self.attachment_formats[index])
        }
    }

    fn set_format(&mut self, index: usize, format: FormatId) {
        if index == FLAGS_INDEX {
            DEPTH_STENCIL_FORMAT.set(&mut self.attachment_formats[index], u32::from(format.0));
        } else {
            self.attachment_formats[index] = format.0;
        }
    }

    #[must_use]
    pub fn is_color_attachment_enabled(&self, color_index: usize) -> bool {
        color_index < self.color_attachment_range() && !self.format(color_index).is_none()
    }

    #[must_use]
    pub fn has_depth_stencil_attachment(&self) -> bool {
        !self.format(self.depth_stencil_attachment_index()).is_none()
    }

    #[must_use]
    pub fn has_color_resolve_attachment(&self, color_index: usize) -> bool {
        self.color_resolve_mask & (1 << color_index) != 0
    }

    #[must_use]
    pub fn has_color_unresolve_attachment(&self, color_index: usize) -> bool {
        self.color_unresolve_mask & (1 << color_index) != 0
    }

    #[must_use]
    pub fn has_depth_stencil_resolve_attachment(&self) -> bool {
        RESOLVE_DEPTH_STENCIL.get_bool(self.flags())
    }

    #[must_use]
    pub fn has_depth_unresolve_attachment(&self) -> bool {
        UNRESOLVE_DEPTH.get_bool(self.flags())
    }

    #[must_use]
    pub fn has_stencil_unresolve_attachment(&self) -> bool {
        UNRESOLVE_STENCIL.get_bool(self.flags())
    }

    #[must_use]
    pub fn has_any_unresolve_attachment(&self) -> bool {
        self.color_unresolve_mask != 0
            || self.has_depth_unresolve_attachment()
            || self.has_stencil_unresolve_attachment()
    }

    #[must_use]
    pub fn framebuffer_fetch_mode(&self) -> bool {
        FRAMEBUFFER_FETCH.get_bool(self.samples_and_range)
    }

    #[must_use]
    pub fn write_control_mode(&self) -> SrgbWriteControlMode {
        SrgbWriteControlMode::unpack(SRGB_WRITE_CONTROL.get(self.flags()))
    }

    #[must_use]
    pub fn is_render_to_texture(&self) -> bool {
        RENDER_TO_TEXTURE.get_bool(self.flags())
    }

    /// Number of enabled color attachments (gaps excluded).
    #[must_use]
    pub fn color_attachment_count(&self) -> usize {
        (0..self.color_attachment_range())
            .filter(|&i| self.is_color_attachment_enabled(i))
            .count()
    }

    /// Total number of backend attachments, resolve attachments included.
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        let colors = self.color_attachment_count();
        let resolves = self.color_resolve_mask.count_ones() as usize;
        let depth_stencil = usize::from(self.has_depth_stencil_attachment());
        let depth_stencil_resolve = usize::from(self.has_depth_stencil_resolve_attachment());
        colors + resolves + depth_stencil + depth_stencil_resolve
    }

    /// Iterates `(color_index, packed_index)` over enabled color attachments.
    pub fn packed_color_attachments(&self) -> impl Iterator<Item = (usize, PackedAttachmentIndex)> + '_ {
        (0..self.color_attachment_range())
            .filter(|&i| self.is_color_attachment_enabled(i))
            .enumerate()
            .map(|(packed, color_index)| (color_index, PackedAttachmentIndex::new(packed)))
    }

    /// Dense index of the depth/stencil attachment, if present.
    #[must_use]
    pub fn packed_depth_stencil_index(&self) -> Option<PackedAttachmentIndex> {
        self.has_depth_stencil_attachment()
            .then(|| PackedAttachmentIndex::new(self.color_attachment_count()))
    }

    #[inline]
    fn flags(&self) -> u8 {
        self.attachment_formats[FLAGS_INDEX]
    }

    #[inline]
    fn flags_mut(&mut self) -> &mut u8 {
        &mut self.attachment_formats[FLAGS_INDEX]
    }
}

// ─── Attachment Ops ──────────────────────────────────────────────────────────

/// Dense index into the backend render pass attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackedAttachmentIndex(u32);

impl PackedAttachmentIndex {
    #[must_use]
    pub fn new(index: usize) -> Self {
        assert!(index < MAX_FRAMEBUFFER_ATTACHMENTS, "packed attachment index {index} out of range");
        Self(narrow(index))
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

const LOAD_OP: BitField = BitField::new(0, 2);
const STORE_OP: BitField = BitField::new(2, 2);
const STENCIL_LOAD_OP: BitField = BitField::new(4, 2);
const STENCIL_STORE_OP: BitField = BitField::new(6, 2);
const INVALIDATED: BitField = BitField::new(8, 1);
const STENCIL_INVALIDATED: BitField = BitField::new(9, 1);

/// Load/store behaviour of one attachment.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedAttachmentOpsDesc {
    ops: u16,
    initial_layout: u8,
    final_layout: u8,
}

impl_packed_desc!(PackedAttachmentOpsDesc, 4);

impl PackedAttachmentOpsDesc {
    #[must_use]
    pub fn load_op(&self) -> LoadOp {
        LoadOp::unpack(LOAD_OP.get(self.ops))
    }

    #[must_use]
    pub fn store_op(&self) -> StoreOp {
        StoreOp::unpack(STORE_OP.get(self.ops))
    }

    #[must_use]
    pub fn stencil_load_op(&self) -> LoadOp {
        LoadOp::unpack(STENCIL_LOAD_OP.get(self.ops))
    }

    #[must_use]
    pub fn stencil_store_op(&self) -> StoreOp {
        StoreOp::unpack(STENCIL_STORE_OP.get(self.ops))
    }

    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        INVALIDATED.get_bool(self.ops)
    }

    #[must_use]
    pub fn is_stencil_invalidated(&self) -> bool {
        STENCIL_INVALIDATED.get_bool(self.ops)
    }

    #[must_use]
    pub fn initial_layout(&self) -> ImageLayout {
        ImageLayout::unpack(u32::from(self.initial_layout))
    }

    #[must_use]
    pub fn final_layout(&self) -> ImageLayout {
        ImageLayout::unpack(u32::from(self.final_layout))
    }
}

/// Per-attachment ops of a render pass, indexed by [`PackedAttachmentIndex`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct AttachmentOpsArray {
    ops: [PackedAttachmentOpsDesc; MAX_FRAMEBUFFER_ATTACHMENTS],
}

impl_packed_desc!(AttachmentOpsArray, 4 * MAX_FRAMEBUFFER_ATTACHMENTS);

impl AttachmentOpsArray {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: PackedAttachmentIndex) -> &PackedAttachmentOpsDesc {
        &self.ops[index.get()]
    }

    #[inline]
    fn get_mut(&mut self, index: PackedAttachmentIndex) -> &mut PackedAttachmentOpsDesc {
        &mut self.ops[index.get()]
    }

    /// Load/store for both aspects, with the given layouts.
    pub fn init_with_load_store(
        &mut self,
        index: PackedAttachmentIndex,
        initial_layout: ImageLayout,
        final_layout: ImageLayout,
    ) {
        self.set_layouts(index, initial_layout, final_layout);
        self.set_ops(index, LoadOp::Load, StoreOp::Store);
        self.set_stencil_ops(index, LoadOp::Load, StoreOp::Store);
    }

    pub fn set_layouts(&mut self, index: PackedAttachmentIndex, initial_layout: ImageLayout, final_layout: ImageLayout) {
        let desc = self.get_mut(index);
        desc.initial_layout = narrow(initial_layout.to_bits());
        desc.final_layout = narrow(final_layout.to_bits());
    }

    pub fn set_ops(&mut self, index: PackedAttachmentIndex, load_op: LoadOp, store_op: StoreOp) {
        let desc = self.get_mut(index);
        LOAD_OP.set(&mut desc.ops, load_op.to_bits());
        STORE_OP.set(&mut desc.ops, store_op.to_bits());
        INVALIDATED.set_bool(&mut desc.ops, false);
    }

    pub fn set_stencil_ops(&mut self, index: PackedAttachmentIndex, load_op: LoadOp, store_op: StoreOp) {
        let desc = self.get_mut(index);
        STENCIL_LOAD_OP.set(&mut desc.ops, load_op.to_bits());
        STENCIL_STORE_OP.set(&mut desc.ops, store_op.to_bits());
        STENCIL_INVALIDATED.set_bool(&mut desc.ops, false);
    }

    pub fn set_clear_op(&mut self, index: PackedAttachmentIndex) {
        LOAD_OP.set(&mut self.get_mut(index).ops, LoadOp::Clear.to_bits());
    }

    pub fn set_clear_stencil_op(&mut self, index: PackedAttachmentIndex) {
        STENCIL_LOAD_OP.set(&mut self.get_mut(index).ops, LoadOp::Clear.to_bits());
    }

    /// The attachment contents are not needed after the pass.
    pub fn set_invalidated(&mut self, index: PackedAttachmentIndex) {
        let desc = self.get_mut(index);
        INVALIDATED.set_bool(&mut desc.ops, true);
        STORE_OP.set(&mut desc.ops, StoreOp::DontCare.to_bits());
    }

    pub fn set_stencil_invalidated(&mut self, index: PackedAttachmentIndex) {
        let desc = self.get_mut(index);
        STENCIL_INVALIDATED.set_bool(&mut desc.ops, true);
        STENCIL_STORE_OP.set(&mut desc.ops, StoreOp::DontCare.to_bits());
    }

    /// Ops for every attachment of `desc`: load/store with attachment-optimal layouts.
    #[must_use]
    pub fn default_for(desc: &RenderPassDesc) -> Self {
        let mut ops = Self::new();
        for (_, packed) in desc.packed_color_attachments() {
            ops.init_with_load_store(packed, ImageLayout::ColorAttachment, ImageLayout::ColorAttachment);
        }
        if let Some(packed) = desc.packed_depth_stencil_index() {
            ops.init_with_load_store(
                packed,
                ImageLayout::DepthStencilAttachment,
                ImageLayout::DepthStencilAttachment,
            );
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_color_desc() -> RenderPassDesc {
        let mut desc = RenderPassDesc::new();
        desc.pack_color_attachment(0, FormatId::R8G8B8A8_UNORM);
        desc.pack_color_attachment(1, FormatId::R16G16B16A16_FLOAT);
        desc
    }

    #[test]
    fn test_gaps_are_kept_in_color_range() {
        let mut desc = RenderPassDesc::new();
        desc.pack_color_attachment(0, FormatId::R8G8B8A8_UNORM);
        desc.pack_color_attachment_gap(1);
        desc.pack_color_attachment(2, FormatId::R8G8B8A8_UNORM);
        desc.pack_depth_stencil_attachment(FormatId::D24_UNORM_S8_UINT);

        assert_eq!(desc.color_attachment_range(), 3);
        assert_eq!(desc.color_attachment_count(), 2);
        assert!(!desc.is_color_attachment_enabled(1));
        assert_eq!(desc.depth_stencil_attachment_index(), 3);
        assert_eq!(desc.format(3), FormatId::D24_UNORM_S8_UINT);
        assert_eq!(desc.packed_depth_stencil_index(), Some(PackedAttachmentIndex::new(2)));
        assert_eq!(desc.attachment_count(), 3);
    }

    #[test]
    fn test_depth_stencil_shares_flag_byte_when_range_is_full() {
        let mut desc = RenderPassDesc::new();
        for i in 0..MAX_DRAW_BUFFERS {
            desc.pack_color_attachment(i, FormatId::R8G8B8A8_UNORM);
        }
        desc.update_render_to_texture(true);
        desc.set_write_control_mode(SrgbWriteControlMode::Linear);
        desc.pack_depth_stencil_attachment(FormatId::D32_FLOAT_S8_UINT);
        desc.pack_depth_stencil_resolve_attachment();

        assert_eq!(desc.format(MAX_DRAW_BUFFERS), FormatId::D32_FLOAT_S8_UINT);
        assert!(desc.is_render_to_texture());
        assert!(desc.has_depth_stencil_resolve_attachment());
        assert_eq!(desc.write_control_mode(), SrgbWriteControlMode::Linear);
    }

    #[test]
    fn test_samples_are_stored_as_log2() {
        let mut desc = two_color_desc();
        desc.set_samples(4);
        assert_eq!(desc.samples(), 4);
        desc.set_samples(128);
        assert_eq!(desc.samples(), 128);
    }

    #[test]
    #[should_panic(expected = "does not fit in a 3-bit field")]
    fn test_sample_count_overflow_is_rejected() {
        let mut desc = two_color_desc();
        desc.set_samples(256);
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn test_non_power_of_two_samples_are_rejected() {
        RenderPassDesc::new().set_samples(3);
    }

    #[test]
    #[should_panic(expected = "before depth/stencil")]
    fn test_color_after_depth_stencil_panics() {
        let mut desc = two_color_desc();
        desc.pack_depth_stencil_attachment(FormatId::D16_UNORM);
        desc.pack_color_attachment(2, FormatId::R8G8B8A8_UNORM);
    }

    #[test]
    fn test_resolve_and_unresolve_masks() {
        let mut desc = two_color_desc();
        desc.pack_color_resolve_attachment(1);
        desc.pack_color_unresolve_attachment(0);
        assert!(desc.has_color_resolve_attachment(1));
        assert!(desc.has_any_unresolve_attachment());
        assert_eq!(desc.attachment_count(), 3);

        desc.remove_color_resolve_attachment(1);
        desc.remove_color_unresolve_attachment(0);
        assert!(!desc.has_color_resolve_attachment(1));
        assert!(!desc.has_any_unresolve_attachment());
    }

    #[test]
    fn test_same_mutations_produce_identical_bytes() {
        let a = two_color_desc();
        let b = two_color_desc();
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());

        let mut c = two_color_desc();
        c.set_framebuffer_fetch_mode(true);
        assert_ne!(a, c);
    }

    #[test]
    fn test_default_ops_follow_packed_indices() {
        let mut desc = two_color_desc();
        desc.pack_depth_stencil_attachment(FormatId::D24_UNORM_S8_UINT);
        let ops = AttachmentOpsArray::default_for(&desc);

        let color = ops.get(PackedAttachmentIndex::new(1));
        assert_eq!(color.load_op(), LoadOp::Load);
        assert_eq!(color.store_op(), StoreOp::Store);
        assert_eq!(color.final_layout(), ImageLayout::ColorAttachment);

        let ds = ops.get(PackedAttachmentIndex::new(2));
        assert_eq!(ds.initial_layout(), ImageLayout::DepthStencilAttachment);
        assert_eq!(ds.stencil_store_op(), StoreOp::Store);
    }

    #[test]
    fn test_invalidate_switches_store_to_dont_care() {
        let mut ops = AttachmentOpsArray::new();
        let index = PackedAttachmentIndex::new(0);
        ops.init_with_load_store(index, ImageLayout::Undefined, ImageLayout::ColorAttachment);
        ops.set_clear_op(index);
        ops.set_invalidated(index);

        let desc = ops.get(index);
        assert_eq!(desc.load_op(), LoadOp::Clear);
        assert_eq!(desc.store_op(), StoreOp::DontCare);
        assert!(desc.is_invalidated());
        assert!(!desc.is_stencil_invalidated());
    }
}
