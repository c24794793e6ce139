//! Framebuffer descriptor.
//!
//! Attachment view identities laid out at fixed slots:
//!
//! ```text
//!  slot:   0    1 ..= 8     9           10 ..= 17
//!         DS   colors 0-7  DS resolve  color resolves 0-7
//! ```
//!
//! `max_index` is one past the highest slot written with a valid serial, so
//! the tail of the array never matters for identity.

use bytemuck::{Pod, Zeroable};

use super::descriptor_set::ImageOrBufferViewSubresourceSerial;
use super::state::{PackedEnum, SrgbWriteControlMode};
use super::{MAX_DRAW_BUFFERS, MAX_FRAMEBUFFER_ATTACHMENTS_WITH_RESOLVE};
use crate::packing::{BitField, narrow};

const MAX_INDEX: BitField = BitField::new(0, 5);
const FRAMEBUFFER_FETCH: BitField = BitField::new(5, 1);
const LAYER_COUNT: BitField = BitField::new(6, 9);
const SRGB_WRITE_CONTROL: BitField = BitField::new(15, 1);
const UNRESOLVE_MASK: BitField = BitField::new(16, 9);
const RENDER_TO_TEXTURE: BitField = BitField::new(25, 1);

const DEPTH_STENCIL_SLOT: usize = 0;
const COLOR_SLOT_BASE: usize = 1;
const DEPTH_STENCIL_RESOLVE_SLOT: usize = COLOR_SLOT_BASE + MAX_DRAW_BUFFERS;
const COLOR_RESOLVE_SLOT_BASE: usize = DEPTH_STENCIL_RESOLVE_SLOT + 1;

const _: () = assert!(COLOR_RESOLVE_SLOT_BASE + MAX_DRAW_BUFFERS == MAX_FRAMEBUFFER_ATTACHMENTS_WITH_RESOLVE);

/// Bit of the unresolve mask that marks depth/stencil unresolve.
pub const UNRESOLVE_DEPTH_STENCIL_BIT: u32 = 1 << MAX_DRAW_BUFFERS;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct FramebufferDesc {
    header: u32,
    serials: [ImageOrBufferViewSubresourceSerial; MAX_FRAMEBUFFER_ATTACHMENTS_WITH_RESOLVE],
}

impl_packed_desc!(FramebufferDesc, 4 + 8 * MAX_FRAMEBUFFER_ATTACHMENTS_WITH_RESOLVE);

impl FramebufferDesc {
    #[must_use]
    pub fn new() -> Self {
        let mut desc = Self::default();
        LAYER_COUNT.set(&mut desc.header, 1);
        desc
    }

    fn update(&mut self, slot: usize, serial: ImageOrBufferViewSubresourceSerial) {
        self.serials[slot] = serial;
        if serial.is_valid() {
            let max_index = MAX_INDEX.get(self.header).max(narrow(slot + 1));
            MAX_INDEX.set(&mut self.header, max_index);
        }
    }

    pub fn update_color(&mut self, color_index: usize, serial: ImageOrBufferViewSubresourceSerial) {
        assert!(color_index < MAX_DRAW_BUFFERS, "color index {color_index} out of range");
        self.update(COLOR_SLOT_BASE + color_index, serial);
    }

    pub fn update_color_resolve(&mut self, color_index: usize, serial: ImageOrBufferViewSubresourceSerial) {
        assert!(color_index < MAX_DRAW_BUFFERS, "color index {color_index} out of range");
        self.update(COLOR_RESOLVE_SLOT_BASE + color_index, serial);
    }

    pub fn update_depth_stencil(&mut self, serial: ImageOrBufferViewSubresourceSerial) {
        self.update(DEPTH_STENCIL_SLOT, serial);
    }

    pub fn update_depth_stencil_resolve(&mut self, serial: ImageOrBufferViewSubresourceSerial) {
        self.update(DEPTH_STENCIL_RESOLVE_SLOT, serial);
    }

    /// Color bits `0..8` plus [`UNRESOLVE_DEPTH_STENCIL_BIT`].
    pub fn update_unresolve_mask(&mut self, mask: u32) {
        UNRESOLVE_MASK.set(&mut self.header, mask);
    }

    pub fn set_write_control_mode(&mut self, mode: SrgbWriteControlMode) {
        SRGB_WRITE_CONTROL.set(&mut self.header, mode.to_bits());
    }

    pub fn update_layer_count(&mut self, layer_count: u32) {
        LAYER_COUNT.set(&mut self.header, layer_count);
    }

    pub fn update_framebuffer_fetch_mode(&mut self, has_framebuffer_fetch: bool) {
        FRAMEBUFFER_FETCH.set_bool(&mut self.header, has_framebuffer_fetch);
    }

    pub fn update_render_to_texture(&mut self, is_render_to_texture: bool) {
        RENDER_TO_TEXTURE.set_bool(&mut self.header, is_render_to_texture);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Number of leading slots that take part in identity.
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        MAX_INDEX.get(self.header) as usize
    }

    #[must_use]
    pub fn color_image_view_serial(&self, color_index: usize) -> ImageOrBufferViewSubresourceSerial {
        self.serials[COLOR_SLOT_BASE + color_index]
    }

    #[must_use]
    pub fn depth_stencil_image_view_serial(&self) -> ImageOrBufferViewSubresourceSerial {
        self.serials[DEPTH_STENCIL_SLOT]
    }

    #[must_use]
    pub fn layer_count(&self) -> u32 {
        LAYER_COUNT.get(self.header)
    }

    #[must_use]
    pub fn unresolve_mask(&self) -> u32 {
        UNRESOLVE_MASK.get(self.header)
    }

    #[must_use]
    pub fn framebuffer_fetch_mode(&self) -> bool {
        FRAMEBUFFER_FETCH.get_bool(self.header)
    }

    #[must_use]
    pub fn write_control_mode(&self) -> SrgbWriteControlMode {
        SrgbWriteControlMode::unpack(SRGB_WRITE_CONTROL.get(self.header))
    }

    #[must_use]
    pub fn is_render_to_texture(&self) -> bool {
        RENDER_TO_TEXTURE.get_bool(self.header)
    }

    /// Valid attachment serials in slot order.
    pub fn attachments(&self) -> impl Iterator<Item = &ImageOrBufferViewSubresourceSerial> + '_ {
        self.serials[..self.attachment_count()]
            .iter()
            .filter(|serial| serial.is_valid())
    }
}
