//! Compares following a memoized pipeline transition against a full
//! descriptor lookup for the same state change.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::UVec2;
use state_cache::cache::GraphicsPipelineCache;
use state_cache::desc::{
    AttachmentOpsArray, CullMode, DescriptorSetLayoutDesc, FramebufferDesc, GraphicsPipelineDesc,
    GraphicsPipelineTransitionBits, PipelineLayoutDesc, RenderPassDesc, SamplerDesc, YcbcrConversionDesc,
};
use state_cache::device::{Device, GraphicsPipelineCreateInfo};
use state_cache::errors::Result;
use state_cache::settings::CacheSettings;

/// Creates nothing; the bench only measures lookups.
struct NullDevice;

impl Device for NullDevice {
    type RenderPass = ();
    type Pipeline = ();
    type ShaderModule = ();
    type DescriptorSetLayout = ();
    type PipelineLayout = ();
    type Sampler = ();
    type YcbcrConversion = ();
    type Framebuffer = ();

    fn create_render_pass(&mut self, _: &RenderPassDesc, _: &AttachmentOpsArray) -> Result<()> {
        Ok(())
    }

    fn create_graphics_pipeline(&mut self, _: &GraphicsPipelineCreateInfo<'_, Self>, _: &GraphicsPipelineDesc) -> Result<()> {
        Ok(())
    }

    fn create_descriptor_set_layout(&mut self, _: &DescriptorSetLayoutDesc) -> Result<()> {
        Ok(())
    }

    fn create_pipeline_layout(&mut self, _: &PipelineLayoutDesc, _: &[&()]) -> Result<()> {
        Ok(())
    }

    fn create_sampler(&mut self, _: &SamplerDesc) -> Result<()> {
        Ok(())
    }

    fn create_ycbcr_conversion(&mut self, _: &YcbcrConversionDesc) -> Result<()> {
        Ok(())
    }

    fn create_framebuffer(&mut self, _: &FramebufferDesc, _: &(), _: UVec2) -> Result<()> {
        Ok(())
    }
}

fn benchmark_pipeline_transition(c: &mut Criterion) {
    let mut device = NullDevice;
    let mut cache = GraphicsPipelineCache::new(&CacheSettings::default());
    let info = GraphicsPipelineCreateInfo::<NullDevice>::new(&(), &());

    let base = GraphicsPipelineDesc::with_defaults(&CacheSettings::default());
    let from = cache.get_pipeline(&mut device, &info, &base).unwrap();

    let mut bits = GraphicsPipelineTransitionBits::empty();
    let mut culled = base;
    culled.update_cull_mode(&mut bits, CullMode::Back);
    let _ = cache
        .get_pipeline_with_transition(&mut device, &info, from, bits, &culled)
        .unwrap();

    let mut group = c.benchmark_group("pipeline_lookup");

    group.bench_function("transition", |b| {
        b.iter(|| black_box(cache.find_transition(black_box(from), black_box(bits), black_box(&culled))));
    });

    group.bench_function("full_lookup", |b| {
        b.iter(|| black_box(cache.lookup(black_box(&culled))));
    });

    group.finish();
}

criterion_group!(benches, benchmark_pipeline_transition);
criterion_main!(benches);
