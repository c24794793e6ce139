//! Per-draw binding-set descriptors.
//!
//! Snapshots of which resource identities are bound for one draw call. They
//! key the binding-set caches, so they hold serials, never objects.

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;

use super::{MAX_ACTIVE_TEXTURES, MAX_TRANSFORM_FEEDBACK_BUFFERS};
use crate::packing::{BitField, hash_bytes, narrow};
use crate::serial::{BufferSerial, ImageOrBufferViewSerial, SamplerSerial};

// ─── Subresource Serial ──────────────────────────────────────────────────────

const LEVEL: BitField = BitField::new(0, 10);
const LEVEL_COUNT: BitField = BitField::new(10, 6);
const LAYER: BitField = BitField::new(16, 13);
const SINGLE_LAYER: BitField = BitField::new(29, 1);
const SRGB_DECODE: BitField = BitField::new(30, 1);
const SRGB_OVERRIDE: BitField = BitField::new(31, 1);

/// Packed range of an image view: base level/layer and flags.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct ImageSubresourceRange(u32);

impl ImageSubresourceRange {
    #[must_use]
    pub fn new(level: u32, level_count: u32, layer: u32, single_layer: bool) -> Self {
        let mut range = Self(0);
        LEVEL.set(&mut range.0, level);
        LEVEL_COUNT.set(&mut range.0, level_count);
        LAYER.set(&mut range.0, layer);
        SINGLE_LAYER.set_bool(&mut range.0, single_layer);
        range
    }

    #[must_use]
    pub fn with_srgb_modes(mut self, srgb_decode: bool, srgb_override: bool) -> Self {
        SRGB_DECODE.set_bool(&mut self.0, srgb_decode);
        SRGB_OVERRIDE.set_bool(&mut self.0, srgb_override);
        self
    }

    #[must_use]
    pub fn level(self) -> u32 {
        LEVEL.get(self.0)
    }

    #[must_use]
    pub fn level_count(self) -> u32 {
        LEVEL_COUNT.get(self.0)
    }

    #[must_use]
    pub fn layer(self) -> u32 {
        LAYER.get(self.0)
    }

    #[must_use]
    pub fn is_single_layer(self) -> bool {
        SINGLE_LAYER.get_bool(self.0)
    }
}

/// View identity plus the subresource range it covers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
pub struct ImageOrBufferViewSubresourceSerial {
    pub view_serial: ImageOrBufferViewSerial,
    pub subresource: ImageSubresourceRange,
}

impl ImageOrBufferViewSubresourceSerial {
    #[must_use]
    pub fn new(view_serial: ImageOrBufferViewSerial, subresource: ImageSubresourceRange) -> Self {
        Self {
            view_serial,
            subresource,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.view_serial.is_valid()
    }
}

// ─── Texture Bindings ────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TexUnitSerials {
    pub view: ImageOrBufferViewSubresourceSerial,
    pub sampler: SamplerSerial,
}

/// Texture and sampler identities per texture unit.
///
/// Only the units below `max_index` take part in hashing and equality.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TextureDescriptorDesc {
    max_index: u32,
    units: [TexUnitSerials; MAX_ACTIVE_TEXTURES],
}

const _: () = assert!(size_of::<TextureDescriptorDesc>() == 4 + 12 * MAX_ACTIVE_TEXTURES);

impl Default for TextureDescriptorDesc {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl TextureDescriptorDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, unit: usize, view: ImageOrBufferViewSubresourceSerial, sampler: SamplerSerial) {
        assert!(unit < MAX_ACTIVE_TEXTURES, "texture unit {unit} out of range");
        self.max_index = self.max_index.max(narrow(unit + 1));
        self.units[unit] = TexUnitSerials { view, sampler };
    }

    pub fn reset(&mut self) {
        *self = Self::zeroed();
    }

    #[must_use]
    pub fn max_index(&self) -> usize {
        self.max_index as usize
    }

    #[must_use]
    pub fn unit(&self, unit: usize) -> &TexUnitSerials {
        &self.units[unit]
    }

    fn used_units(&self) -> &[TexUnitSerials] {
        &self.units[..self.max_index()]
    }

    #[must_use]
    pub fn hash(&self) -> u64 {
        hash_bytes(bytemuck::cast_slice(self.used_units()))
    }
}

impl PartialEq for TextureDescriptorDesc {
    fn eq(&self, other: &Self) -> bool {
        self.max_index == other.max_index && self.used_units() == other.used_units()
    }
}

impl Eq for TextureDescriptorDesc {}

impl std::hash::Hash for TextureDescriptorDesc {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(TextureDescriptorDesc::hash(self));
    }
}

// ─── Uniform & Transform Feedback Bindings ───────────────────────────────────

const MAX_UNIFORM_AND_XFB_BUFFERS: usize = 1 + MAX_TRANSFORM_FEEDBACK_BUFFERS;

/// Default uniform buffer (slot 0) plus transform feedback buffers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct UniformsAndXfbDescriptorDesc {
    buffer_count: u32,
    buffer_serials: [BufferSerial; MAX_UNIFORM_AND_XFB_BUFFERS],
    xfb_buffer_offsets: [u64; MAX_TRANSFORM_FEEDBACK_BUFFERS],
}

impl_packed_desc!(
    UniformsAndXfbDescriptorDesc,
    4 + 4 * MAX_UNIFORM_AND_XFB_BUFFERS + 8 * MAX_TRANSFORM_FEEDBACK_BUFFERS
);

impl UniformsAndXfbDescriptorDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_default_uniform_buffer(&mut self, serial: BufferSerial) {
        self.buffer_serials[0] = serial;
        self.buffer_count = self.buffer_count.max(1);
    }

    pub fn update_transform_feedback_buffer(&mut self, xfb_index: usize, serial: BufferSerial, offset: u64) {
        assert!(
            xfb_index < MAX_TRANSFORM_FEEDBACK_BUFFERS,
            "transform feedback buffer {xfb_index} out of range"
        );
        let slot = xfb_index + 1;
        self.buffer_serials[slot] = serial;
        self.xfb_buffer_offsets[xfb_index] = offset;
        self.buffer_count = self.buffer_count.max(narrow(slot + 1));
    }

    pub fn reset(&mut self) {
        *self = Self::zeroed();
    }

    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.buffer_count as usize
    }

    #[must_use]
    pub fn default_uniform_buffer(&self) -> BufferSerial {
        self.buffer_serials[0]
    }

    /// `(serial, offset)` of transform feedback buffer `xfb_index`.
    #[must_use]
    pub fn transform_feedback_buffer(&self, xfb_index: usize) -> (BufferSerial, u64) {
        (self.buffer_serials[xfb_index + 1], self.xfb_buffer_offsets[xfb_index])
    }
}

// ─── Shader Buffer Bindings ──────────────────────────────────────────────────

/// Variable-length payload of buffer serials and raw 32-bit values
/// describing storage/uniform/atomic-counter buffer bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderBuffersDescriptorDesc {
    payload: SmallVec<[u32; 32]>,
}

impl ShaderBuffersDescriptorDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_buffer_serial(&mut self, serial: BufferSerial) {
        self.payload.push(serial.value());
    }

    pub fn append_32bit_value(&mut self, value: u32) {
        self.payload.push(value);
    }

    /// Appends `value` as two words, low word first.
    pub fn append_64bit_value(&mut self, value: u64) {
        self.payload.push(value as u32);
        self.payload.push((value >> 32) as u32);
    }

    pub fn reset(&mut self) {
        self.payload.clear();
    }

    #[must_use]
    pub fn payload(&self) -> &[u32] {
        &self.payload
    }

    #[must_use]
    pub fn hash(&self) -> u64 {
        hash_bytes(bytemuck::cast_slice(&self.payload))
    }
}

impl std::hash::Hash for ShaderBuffersDescriptorDesc {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(ShaderBuffersDescriptorDesc::hash(self));
    }
}
