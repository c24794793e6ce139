//! Device collaborator.
//!
//! The caches never talk to a graphics API directly. Every object they hold is
//! produced by a [`Device`] from a fully-specified descriptor, and handed back
//! to it for destruction. A wgpu-backed implementation builds its state from
//! the translations in [`crate::desc::wgpu_state`]; tests plug in a counting
//! mock.

use glam::UVec2;

use crate::desc::{
    AttachmentOpsArray, DescriptorSetLayoutDesc, FramebufferDesc, GraphicsPipelineDesc, PipelineLayoutDesc,
    RenderPassDesc, SamplerDesc, ShaderType, SurfaceRotation, YcbcrConversionDesc,
};
use crate::errors::Result;

/// Factory for the GPU objects the caches deduplicate.
///
/// `create_*` calls are synchronous and may fail; the calling cache is left
/// untouched when they do. `destroy_*` receives objects the cache no longer
/// references. The default implementations simply drop them.
pub trait Device {
    type RenderPass;
    type Pipeline;
    type ShaderModule;
    type DescriptorSetLayout;
    type PipelineLayout;
    type Sampler;
    type YcbcrConversion;
    type Framebuffer;

    fn create_render_pass(&mut self, desc: &RenderPassDesc, ops: &AttachmentOpsArray) -> Result<Self::RenderPass>;

    fn create_graphics_pipeline(
        &mut self,
        info: &GraphicsPipelineCreateInfo<'_, Self>,
        desc: &GraphicsPipelineDesc,
    ) -> Result<Self::Pipeline>;

    fn create_descriptor_set_layout(&mut self, desc: &DescriptorSetLayoutDesc) -> Result<Self::DescriptorSetLayout>;

    /// `set_layouts` holds one resolved layout per descriptor set of `desc`,
    /// in set order.
    fn create_pipeline_layout(
        &mut self,
        desc: &PipelineLayoutDesc,
        set_layouts: &[&Self::DescriptorSetLayout],
    ) -> Result<Self::PipelineLayout>;

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<Self::Sampler>;

    fn create_ycbcr_conversion(&mut self, desc: &YcbcrConversionDesc) -> Result<Self::YcbcrConversion>;

    fn create_framebuffer(
        &mut self,
        desc: &FramebufferDesc,
        render_pass: &Self::RenderPass,
        extent: UVec2,
    ) -> Result<Self::Framebuffer>;

    fn destroy_render_pass(&mut self, render_pass: Self::RenderPass) {
        drop(render_pass);
    }

    fn destroy_pipeline(&mut self, pipeline: Self::Pipeline) {
        drop(pipeline);
    }

    fn destroy_descriptor_set_layout(&mut self, layout: Self::DescriptorSetLayout) {
        drop(layout);
    }

    fn destroy_pipeline_layout(&mut self, layout: Self::PipelineLayout) {
        drop(layout);
    }

    fn destroy_sampler(&mut self, sampler: Self::Sampler) {
        drop(sampler);
    }

    fn destroy_ycbcr_conversion(&mut self, conversion: Self::YcbcrConversion) {
        drop(conversion);
    }

    fn destroy_framebuffer(&mut self, framebuffer: Self::Framebuffer) {
        drop(framebuffer);
    }
}

/// Specialization constants baked into a pipeline alongside its state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecializationConstants {
    pub line_raster_emulation: bool,
    pub surface_rotation: SurfaceRotation,
    pub drawable_width: f32,
    pub drawable_height: f32,
}

impl Default for SpecializationConstants {
    fn default() -> Self {
        Self {
            line_raster_emulation: false,
            surface_rotation: SurfaceRotation::Identity,
            drawable_width: 0.0,
            drawable_height: 0.0,
        }
    }
}

/// Already-resolved objects a pipeline is created against.
pub struct GraphicsPipelineCreateInfo<'a, D: Device + ?Sized> {
    pub compatible_render_pass: &'a D::RenderPass,
    pub pipeline_layout: &'a D::PipelineLayout,
    /// Indexed by [`ShaderType::index`].
    pub shader_modules: [Option<&'a D::ShaderModule>; ShaderType::COUNT],
    /// Bit `i` set when vertex attribute `i` is consumed by the vertex shader.
    pub active_attrib_locations: u16,
    pub specialization: SpecializationConstants,
}

impl<'a, D: Device + ?Sized> GraphicsPipelineCreateInfo<'a, D> {
    #[must_use]
    pub fn new(compatible_render_pass: &'a D::RenderPass, pipeline_layout: &'a D::PipelineLayout) -> Self {
        Self {
            compatible_render_pass,
            pipeline_layout,
            shader_modules: [None; ShaderType::COUNT],
            active_attrib_locations: 0,
            specialization: SpecializationConstants::default(),
        }
    }

    #[must_use]
    pub fn with_shader(mut self, shader_type: ShaderType, module: &'a D::ShaderModule) -> Self {
        self.shader_modules[shader_type.index()] = Some(module);
        self
    }

    #[must_use]
    pub fn shader(&self, shader_type: ShaderType) -> Option<&'a D::ShaderModule> {
        self.shader_modules[shader_type.index()]
    }
}
