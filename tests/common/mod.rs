//! Shared test harness: a [`Device`] that hands out numbered objects, counts
//! creations and destructions, and can be told to fail its next creation.

#![allow(dead_code)]

use glam::UVec2;

use state_cache::cache::CacheKind;
use state_cache::desc::{
    AttachmentOpsArray, DescriptorSetLayoutDesc, DescriptorType, FormatId, FramebufferDesc, GraphicsPipelineDesc,
    PipelineLayoutDesc, RenderPassDesc, SamplerDesc, ShaderStageFlags, YcbcrConversionDesc,
};
use state_cache::device::{Device, GraphicsPipelineCreateInfo};
use state_cache::errors::{CacheError, Result};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Per-kind object counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectCounts {
    pub render_passes: u32,
    pub pipelines: u32,
    pub set_layouts: u32,
    pub pipeline_layouts: u32,
    pub samplers: u32,
    pub ycbcr_conversions: u32,
    pub framebuffers: u32,
}

/// A pipeline layout that remembers which set layouts it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPipelineLayout {
    pub id: u64,
    pub set_layouts: Vec<u64>,
}

#[derive(Debug, Default)]
pub struct MockDevice {
    next_id: u64,
    fail_next: Option<(Option<CacheKind>, CacheError)>,
    pub created: ObjectCounts,
    pub destroyed: ObjectCounts,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create_*` call return `error`.
    pub fn fail_next(&mut self, error: CacheError) {
        self.fail_next = Some((None, error));
    }

    /// Makes the next creation of a `kind` object return `error`; other
    /// kinds keep succeeding.
    pub fn fail_next_of(&mut self, kind: CacheKind, error: CacheError) {
        self.fail_next = Some((Some(kind), error));
    }

    fn next_object(&mut self, kind: CacheKind) -> Result<u64> {
        let armed = match &self.fail_next {
            Some((None, _)) => true,
            Some((Some(target), _)) => *target == kind,
            None => false,
        };
        if armed && let Some((_, error)) = self.fail_next.take() {
            return Err(error);
        }
        self.next_id += 1;
        Ok(self.next_id)
    }

    /// Objects created and not yet destroyed, across every kind.
    pub fn live_objects(&self) -> u32 {
        let c = self.created;
        let d = self.destroyed;
        (c.render_passes - d.render_passes)
            + (c.pipelines - d.pipelines)
            + (c.set_layouts - d.set_layouts)
            + (c.pipeline_layouts - d.pipeline_layouts)
            + (c.samplers - d.samplers)
            + (c.ycbcr_conversions - d.ycbcr_conversions)
            + (c.framebuffers - d.framebuffers)
    }
}

impl Device for MockDevice {
    type RenderPass = u64;
    type Pipeline = u64;
    type ShaderModule = u64;
    type DescriptorSetLayout = u64;
    type PipelineLayout = MockPipelineLayout;
    type Sampler = u64;
    type YcbcrConversion = u64;
    type Framebuffer = u64;

    fn create_render_pass(&mut self, _desc: &RenderPassDesc, _ops: &AttachmentOpsArray) -> Result<u64> {
        let id = self.next_object(CacheKind::CompatibleRenderPass)?;
        self.created.render_passes += 1;
        Ok(id)
    }

    fn create_graphics_pipeline(
        &mut self,
        _info: &GraphicsPipelineCreateInfo<'_, Self>,
        _desc: &GraphicsPipelineDesc,
    ) -> Result<u64> {
        let id = self.next_object(CacheKind::GraphicsPipeline)?;
        self.created.pipelines += 1;
        Ok(id)
    }

    fn create_descriptor_set_layout(&mut self, _desc: &DescriptorSetLayoutDesc) -> Result<u64> {
        let id = self.next_object(CacheKind::DescriptorSetLayout)?;
        self.created.set_layouts += 1;
        Ok(id)
    }

    fn create_pipeline_layout(
        &mut self,
        _desc: &PipelineLayoutDesc,
        set_layouts: &[&u64],
    ) -> Result<MockPipelineLayout> {
        let id = self.next_object(CacheKind::PipelineLayout)?;
        self.created.pipeline_layouts += 1;
        Ok(MockPipelineLayout {
            id,
            set_layouts: set_layouts.iter().map(|&&layout| layout).collect(),
        })
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<u64> {
        let id = self.next_object(CacheKind::Sampler)?;
        self.created.samplers += 1;
        Ok(id)
    }

    fn create_ycbcr_conversion(&mut self, _desc: &YcbcrConversionDesc) -> Result<u64> {
        let id = self.next_object(CacheKind::SamplerYcbcrConversion)?;
        self.created.ycbcr_conversions += 1;
        Ok(id)
    }

    fn create_framebuffer(&mut self, _desc: &FramebufferDesc, _render_pass: &u64, _extent: UVec2) -> Result<u64> {
        let id = self.next_object(CacheKind::Framebuffer)?;
        self.created.framebuffers += 1;
        Ok(id)
    }

    fn destroy_render_pass(&mut self, _render_pass: u64) {
        self.destroyed.render_passes += 1;
    }

    fn destroy_pipeline(&mut self, _pipeline: u64) {
        self.destroyed.pipelines += 1;
    }

    fn destroy_descriptor_set_layout(&mut self, _layout: u64) {
        self.destroyed.set_layouts += 1;
    }

    fn destroy_pipeline_layout(&mut self, _layout: MockPipelineLayout) {
        self.destroyed.pipeline_layouts += 1;
    }

    fn destroy_sampler(&mut self, _sampler: u64) {
        self.destroyed.samplers += 1;
    }

    fn destroy_ycbcr_conversion(&mut self, _conversion: u64) {
        self.destroyed.ycbcr_conversions += 1;
    }

    fn destroy_framebuffer(&mut self, _framebuffer: u64) {
        self.destroyed.framebuffers += 1;
    }
}

// ============================================================================
// Descriptor builders
// ============================================================================

pub fn out_of_memory(kind: CacheKind) -> CacheError {
    CacheError::OutOfDeviceMemory(kind)
}

/// Two RGBA8 color attachments, no depth/stencil.
pub fn two_color_render_pass() -> RenderPassDesc {
    let mut desc = RenderPassDesc::new();
    desc.pack_color_attachment(0, FormatId::R8G8B8A8_UNORM);
    desc.pack_color_attachment(1, FormatId::R8G8B8A8_UNORM);
    desc
}

/// One uniform buffer at binding 0, optionally a combined sampler at binding 1.
pub fn set_layout(with_texture: bool) -> DescriptorSetLayoutDesc {
    let mut desc = DescriptorSetLayoutDesc::new();
    desc.update(0, DescriptorType::UniformBuffer, 1, ShaderStageFlags::VERTEX, None);
    if with_texture {
        desc.update(1, DescriptorType::CombinedImageSampler, 1, ShaderStageFlags::FRAGMENT, None);
    }
    desc
}
