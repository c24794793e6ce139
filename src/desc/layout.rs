//! Descriptor-set-layout and pipeline-layout descriptors.

use bytemuck::{Pod, Zeroable};
use smallvec::SmallVec;

use super::state::{DescriptorType, PackedEnum, ShaderStageFlags, ShaderType};
use super::{MAX_DESCRIPTOR_SET_LAYOUT_BINDINGS, MAX_DESCRIPTOR_SET_LAYOUTS};
use crate::packing::narrow;
use crate::serial::SamplerSerial;

// ─── Descriptor Set Layout ───────────────────────────────────────────────────

/// One binding slot. A zero `count` means the slot is unused.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedDescriptorSetBinding {
    descriptor_type: u8,
    stages: u8,
    count: u16,
    immutable_sampler: SamplerSerial,
}

/// Unpacked view of a used binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub count: u32,
    pub stages: ShaderStageFlags,
    pub immutable_sampler: Option<SamplerSerial>,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DescriptorSetLayoutDesc {
    bindings: [PackedDescriptorSetBinding; MAX_DESCRIPTOR_SET_LAYOUT_BINDINGS],
}

impl Default for DescriptorSetLayoutDesc {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl_packed_desc!(DescriptorSetLayoutDesc, 8 * MAX_DESCRIPTOR_SET_LAYOUT_BINDINGS);

impl DescriptorSetLayoutDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Describes binding `binding_index`. A zero `count` clears the slot.
    ///
    /// # Panics
    ///
    /// Panics if `binding_index` exceeds the fixed binding capacity or `count`
    /// does not fit 16 bits.
    pub fn update(
        &mut self,
        binding_index: usize,
        descriptor_type: DescriptorType,
        count: u32,
        stages: ShaderStageFlags,
        immutable_sampler: Option<SamplerSerial>,
    ) {
        assert!(
            binding_index < MAX_DESCRIPTOR_SET_LAYOUT_BINDINGS,
            "binding index {binding_index} exceeds descriptor set layout capacity"
        );
        let binding = &mut self.bindings[binding_index];
        if count == 0 {
            *binding = PackedDescriptorSetBinding::zeroed();
            return;
        }
        binding.descriptor_type = narrow(descriptor_type.to_bits());
        binding.stages = stages.bits();
        binding.count = narrow(count);
        binding.immutable_sampler = immutable_sampler.unwrap_or(SamplerSerial::INVALID);
    }

    /// Used bindings in binding order.
    #[must_use]
    pub fn unpack_bindings(&self) -> SmallVec<[DescriptorSetLayoutBinding; 8]> {
        self.bindings
            .iter()
            .enumerate()
            .filter(|(_, binding)| binding.count > 0)
            .map(|(index, binding)| DescriptorSetLayoutBinding {
                binding: narrow(index),
                descriptor_type: DescriptorType::unpack(u32::from(binding.descriptor_type)),
                count: u32::from(binding.count),
                stages: ShaderStageFlags::from_bits_truncate(binding.stages),
                immutable_sampler: binding
                    .immutable_sampler
                    .is_valid()
                    .then_some(binding.immutable_sampler),
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.iter().all(|binding| binding.count == 0)
    }
}

// ─── Pipeline Layout ─────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PackedPushConstantRange {
    pub offset: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PipelineLayoutDesc {
    descriptor_set_layouts: [DescriptorSetLayoutDesc; MAX_DESCRIPTOR_SET_LAYOUTS],
    push_constant_ranges: [PackedPushConstantRange; ShaderType::COUNT],
}

impl_packed_desc!(
    PipelineLayoutDesc,
    MAX_DESCRIPTOR_SET_LAYOUTS * 8 * MAX_DESCRIPTOR_SET_LAYOUT_BINDINGS + 8 * ShaderType::COUNT
);

impl PipelineLayoutDesc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_descriptor_set_layout(&mut self, set_index: usize, desc: &DescriptorSetLayoutDesc) {
        assert!(set_index < MAX_DESCRIPTOR_SET_LAYOUTS, "descriptor set {set_index} out of range");
        self.descriptor_set_layouts[set_index] = *desc;
    }

    pub fn update_push_constant_range(&mut self, shader_type: ShaderType, offset: u32, size: u32) {
        self.push_constant_ranges[shader_type.index()] = PackedPushConstantRange { offset, size };
    }

    #[must_use]
    pub fn descriptor_set_layout(&self, set_index: usize) -> &DescriptorSetLayoutDesc {
        &self.descriptor_set_layouts[set_index]
    }

    #[must_use]
    pub fn descriptor_set_layouts(&self) -> &[DescriptorSetLayoutDesc; MAX_DESCRIPTOR_SET_LAYOUTS] {
        &self.descriptor_set_layouts
    }

    #[must_use]
    pub fn push_constant_ranges(&self) -> &[PackedPushConstantRange; ShaderType::COUNT] {
        &self.push_constant_ranges
    }
}
